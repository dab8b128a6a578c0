//! Fixed reference table of the canon, in reading order.

use crate::models::BookSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Book {
    /// Display name, also the vocabulary offered to the generative search.
    pub name: &'static str,
    /// Name understood by the scripture service.
    pub api_name: &'static str,
    pub chapters: u32,
}

const fn book(name: &'static str, api_name: &'static str, chapters: u32) -> Book {
    Book {
        name,
        api_name,
        chapters,
    }
}

pub const BOOKS: [Book; 66] = [
    book("Gênesis", "Genesis", 50),
    book("Êxodo", "Exodus", 40),
    book("Levítico", "Leviticus", 27),
    book("Números", "Numbers", 36),
    book("Deuteronômio", "Deuteronomy", 34),
    book("Josué", "Joshua", 24),
    book("Juízes", "Judges", 21),
    book("Rute", "Ruth", 4),
    book("1 Samuel", "1 Samuel", 31),
    book("2 Samuel", "2 Samuel", 24),
    book("1 Reis", "1 Kings", 22),
    book("2 Reis", "2 Kings", 25),
    book("1 Crônicas", "1 Chronicles", 29),
    book("2 Crônicas", "2 Chronicles", 36),
    book("Esdras", "Ezra", 10),
    book("Neemias", "Nehemiah", 13),
    book("Ester", "Esther", 10),
    book("Jó", "Job", 42),
    book("Salmos", "Psalms", 150),
    book("Provérbios", "Proverbs", 31),
    book("Eclesiastes", "Ecclesiastes", 12),
    book("Cânticos", "Song of Solomon", 8),
    book("Isaías", "Isaiah", 66),
    book("Jeremias", "Jeremiah", 52),
    book("Lamentações", "Lamentations", 5),
    book("Ezequiel", "Ezekiel", 48),
    book("Daniel", "Daniel", 12),
    book("Oséias", "Hosea", 14),
    book("Joel", "Joel", 3),
    book("Amós", "Amos", 9),
    book("Obadias", "Obadiah", 1),
    book("Jonas", "Jonah", 4),
    book("Miquéias", "Micah", 7),
    book("Naum", "Nahum", 3),
    book("Habacuque", "Habakkuk", 3),
    book("Sofonias", "Zephaniah", 3),
    book("Ageu", "Haggai", 2),
    book("Zacarias", "Zechariah", 14),
    book("Malaquias", "Malachi", 4),
    book("Mateus", "Matthew", 28),
    book("Marcos", "Mark", 16),
    book("Lucas", "Luke", 24),
    book("João", "John", 21),
    book("Atos", "Acts", 28),
    book("Romanos", "Romans", 16),
    book("1 Coríntios", "1 Corinthians", 16),
    book("2 Coríntios", "2 Corinthians", 13),
    book("Gálatas", "Galatians", 6),
    book("Efésios", "Ephesians", 6),
    book("Filipenses", "Philippians", 4),
    book("Colossenses", "Colossians", 4),
    book("1 Tessalonicenses", "1 Thessalonians", 5),
    book("2 Tessalonicenses", "2 Thessalonians", 3),
    book("1 Timóteo", "1 Timothy", 6),
    book("2 Timóteo", "2 Timothy", 4),
    book("Tito", "Titus", 3),
    book("Filemom", "Philemon", 1),
    book("Hebreus", "Hebrews", 13),
    book("Tiago", "James", 5),
    book("1 Pedro", "1 Peter", 5),
    book("2 Pedro", "2 Peter", 3),
    book("1 João", "1 John", 5),
    book("2 João", "2 John", 1),
    book("3 João", "3 John", 1),
    book("Judas", "Jude", 1),
    book("Apocalipse", "Revelation", 22),
];

/// Read-only view over a book table. The service always uses [`BOOKS`];
/// tests build short catalogs to exercise the corpus boundaries.
#[derive(Debug, Clone, Copy)]
pub struct BookCatalog {
    books: &'static [Book],
}

impl Default for BookCatalog {
    fn default() -> Self {
        Self::new(&BOOKS)
    }
}

impl BookCatalog {
    pub fn new(books: &'static [Book]) -> Self {
        Self { books }
    }

    pub fn books(&self) -> &'static [Book] {
        self.books
    }

    pub fn get(&self, index: usize) -> Option<&'static Book> {
        self.books.get(index)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.books.iter().position(|book| book.name == name)
    }

    /// Case-insensitive lookup on either the display or the service name.
    pub fn find(&self, name: &str) -> Option<(usize, &'static Book)> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }

        self.books.iter().enumerate().find(|(_, book)| {
            book.name.to_lowercase() == wanted || book.api_name.to_lowercase() == wanted
        })
    }

    /// The chapter read after `(index, chapter)`, or `None` at the end of the
    /// corpus.
    pub fn next_chapter(&self, index: usize, chapter: u32) -> Option<(usize, u32)> {
        let current = self.books.get(index)?;
        if chapter < current.chapters {
            return Some((index, chapter + 1));
        }

        if index + 1 < self.books.len() {
            Some((index + 1, 1))
        } else {
            None
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.books.iter().map(|book| book.name).collect()
    }

    pub fn summaries(&self) -> Vec<BookSummary> {
        self.books
            .iter()
            .map(|book| BookSummary {
                name: book.name,
                chapters: book.chapters,
            })
            .collect()
    }
}
