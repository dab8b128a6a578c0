use crate::books::BookCatalog;
use crate::models::NavigationTarget;

pub const VERSE_OF_THE_DAY: &str = "Pois eu bem sei os planos que tenho para vocês, diz o Senhor, \
planos de fazê-los prosperar e não de causar dano, planos de dar a vocês esperança e um futuro.";
pub const VERSE_OF_THE_DAY_REFERENCE: &str = "Jeremias 29:11";

const QUICK_LINKS: [(&str, u32); 3] = [("Salmos", 23), ("João", 3), ("Romanos", 8)];

/// Text read aloud by the home view's narration button.
pub fn verse_of_the_day_script() -> String {
    format!("{VERSE_OF_THE_DAY} {VERSE_OF_THE_DAY_REFERENCE}.")
}

pub fn quick_links(catalog: &BookCatalog) -> Vec<NavigationTarget> {
    QUICK_LINKS
        .iter()
        .filter_map(|(name, chapter)| {
            catalog.find(name).map(|(_, book)| NavigationTarget {
                book: book.name,
                chapter: *chapter,
            })
        })
        .collect()
}
