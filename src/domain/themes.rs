//! D2 theme catalogs.
//!
//! Theme names are matched case-insensitively, light catalog first.

use super::error::ThemeLookupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub id: i64,
    pub name: &'static str,
}

const fn theme(id: i64, name: &'static str) -> Theme {
    Theme { id, name }
}

pub const LIGHT_CATALOG: &[Theme] = &[
    theme(0, "Neutral Default"),
    theme(1, "Neutral Grey"),
    theme(3, "Flagship Terrastruct"),
    theme(4, "Cool Classics"),
    theme(5, "Mixed Berry Blue"),
    theme(6, "Grape Soda"),
    theme(7, "Aubergine"),
    theme(8, "Colorblind Clear"),
    theme(100, "Vanilla Nitro Cola"),
    theme(101, "Orange Creamsicle"),
    theme(102, "Shirley Temple"),
    theme(103, "Earth Tones"),
    theme(104, "Everglade Green"),
    theme(105, "Buttered Toast"),
    theme(300, "Terminal"),
    theme(301, "Terminal Grayscale"),
    theme(302, "Origami"),
    theme(303, "C4"),
];

pub const DARK_CATALOG: &[Theme] = &[
    theme(200, "Dark Mauve"),
    theme(201, "Dark Flagship Terrastruct"),
];

/// Resolve a theme name to its numeric D2 identifier.
pub fn theme_id(name: &str) -> Result<i64, ThemeLookupError> {
    if name.is_empty() {
        return Err(ThemeLookupError::Empty);
    }

    LIGHT_CATALOG
        .iter()
        .chain(DARK_CATALOG)
        // ASCII-only folding; every catalog name is ASCII.
        .find(|theme| theme.name.eq_ignore_ascii_case(name))
        .map(|theme| theme.id)
        .ok_or_else(|| ThemeLookupError::Unknown(name.to_string()))
}

/// Title-cased, sorted theme names for documentation output.
pub fn theme_names(catalog: &[Theme]) -> Vec<String> {
    let mut names: Vec<String> = catalog.iter().map(|theme| title_case(theme.name)).collect();
    names.sort();
    names
}

fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
