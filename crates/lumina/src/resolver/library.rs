//! Verses available without any network access.

use super::reference::{ParsedQuery, Volume};
use crate::model::{Locator, SlideContent};

struct LibraryVerse {
    book: &'static str,
    chapter: u32,
    verse: u32,
    text: &'static str,
    volume: Volume,
}

const fn nephi(verse: u32, text: &'static str) -> LibraryVerse {
    LibraryVerse {
        book: "1 Nephi",
        chapter: 3,
        verse,
        text,
        volume: Volume::BookOfMormon,
    }
}

const fn john(verse: u32, text: &'static str) -> LibraryVerse {
    LibraryVerse {
        book: "John",
        chapter: 5,
        verse,
        text,
        volume: Volume::Bible,
    }
}

const LIBRARY: &[LibraryVerse] = &[
    nephi(
        1,
        "And it came to pass that I, Nephi, returned from speaking with the Lord, to the tent of my father.",
    ),
    nephi(
        2,
        "And it came to pass that he spake unto me, saying: Behold I have dreamed a dream, in the which the Lord hath commanded me that thou and thy brethren shall return to Jerusalem.",
    ),
    nephi(
        3,
        "For behold, Laban hath the record of the Jews and also a genealogy of my forefathers, and they are engraven upon plates of brass.",
    ),
    nephi(
        4,
        "Wherefore, the Lord hath commanded me that thou and thy brothers should go unto the house of Laban, and seek the records, and bring them down hither into the wilderness.",
    ),
    nephi(
        5,
        "And now, behold thy brothers murmur, saying it is a hard thing which I have required of them; but behold I have not required it of them, but it is a commandment of the Lord.",
    ),
    nephi(
        6,
        "Therefore go, my son, and thou shalt be favored of the Lord, because thou hast not murmured.",
    ),
    nephi(
        7,
        "And it came to pass that I, Nephi, said unto my father: I will go and do the things which the Lord hath commanded, for I know that the Lord giveth no commandments unto the children of men, save he shall prepare a way for them that they may accomplish the thing which he commandeth them.",
    ),
    nephi(
        8,
        "And it came to pass that when my father had heard these words he was exceedingly glad, for he knew that the Lord had been with me.",
    ),
    nephi(
        9,
        "And I, Nephi, and my brethren took our journey in the wilderness, with our tents, to go up to the land of Jerusalem.",
    ),
    nephi(
        10,
        "And it came to pass that when we had come up to the land of Jerusalem, I and my brethren did consult one with another.",
    ),
    john(
        1,
        "After this there was a feast of the Jews; and Jesus went up to Jerusalem.",
    ),
    john(
        2,
        "Now there is at Jerusalem by the sheep market a pool, which is called in the Hebrew tongue Bethesda, having five porches.",
    ),
    john(
        3,
        "In these lay a great multitude of impotent folk, of blind, halt, withered, waiting for the moving of the water.",
    ),
    john(
        4,
        "For an angel went down at a certain season into the pool, and troubled the water: whosoever then first after the troubling of the water stepped in was made whole of whatsoever disease he had.",
    ),
    john(
        5,
        "And a certain man was there, which had an infirmity thirty and eight years.",
    ),
    john(
        6,
        "When Jesus saw him lie, and knew that he had been now a long time in that case, he saith unto him, Wilt thou be made whole?",
    ),
    john(
        7,
        "The impotent man answered him, Sir, I have no man, when the water is troubled, to put me into the pool: but while I am coming, another steppeth down before me.",
    ),
    john(8, "Jesus saith unto him, Rise, take up thy bed, and walk."),
    john(
        9,
        "And immediately the man was made whole, and took up his bed, and walked: and on the same day was the sabbath.",
    ),
    john(
        10,
        "The Jews therefore said unto him that was cured, It is the sabbath day: it is not lawful for thee to carry thy bed.",
    ),
    john(
        39,
        "Search the scriptures; for in them ye think ye have eternal life: and they are they which testify of me.",
    ),
];

/// Exact book/chapter/verse match against the bundled verses.
pub fn lookup(query: &ParsedQuery) -> Option<SlideContent> {
    LIBRARY
        .iter()
        .find(|v| {
            v.book.eq_ignore_ascii_case(&query.book)
                && v.chapter == query.chapter
                && v.verse == query.verse
        })
        .map(|v| SlideContent {
            reference: format!("{} {}:{}", v.book, v.chapter, v.verse),
            body: v.text.to_string(),
            source_label: v.volume.label().to_string(),
            locator: Locator {
                book: v.book.to_string(),
                chapter: v.chapter,
                verse: v.verse,
            },
            tags: Vec::new(),
        })
}
