// Column name mapping for imports
//
// Uploaded headers are frequently Russian. Names are transliterated to Latin, spaces
// become underscores and anything outside [A-Za-z0-9_] is dropped.

/// Rewrites a source column name into a SQL-friendly one
pub trait ColumnNameMapper: Send + Sync {
    fn map_name(&self, name: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Transliterator;

impl Transliterator {
    pub fn new() -> Self {
        Self
    }
}

impl ColumnNameMapper for Transliterator {
    fn map_name(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        for ch in name.trim().chars() {
            if ch == ' ' {
                out.push('_');
            } else if let Some(latin) = cyrillic_to_latin(ch) {
                out.push_str(latin);
            } else if ch.is_ascii_alphanumeric() || ch == '_' {
                out.push(ch);
            }
        }
        out
    }
}

fn cyrillic_to_latin(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' | 'ё' | 'э' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ы' => "y",
        'ю' => "ju",
        'я' => "ja",
        'ъ' | 'ь' | 'Ъ' | 'Ь' => "",
        'А' => "A",
        'Б' => "B",
        'В' => "V",
        'Г' => "G",
        'Д' => "D",
        'Е' | 'Ё' | 'Э' => "E",
        'Ж' => "Zh",
        'З' => "Z",
        'И' => "I",
        'Й' => "J",
        'К' => "K",
        'Л' => "L",
        'М' => "M",
        'Н' => "N",
        'О' => "O",
        'П' => "P",
        'Р' => "R",
        'С' => "S",
        'Т' => "T",
        'У' => "U",
        'Ф' => "F",
        'Х' => "H",
        'Ц' => "Ts",
        'Ч' => "Ch",
        'Ш' => "Sh",
        'Щ' => "Sch",
        'Ы' => "Y",
        'Ю' => "Ju",
        'Я' => "Ja",
        _ => return None,
    };
    Some(latin)
}
