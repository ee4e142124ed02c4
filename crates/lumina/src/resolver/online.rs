//! Public verse sources: bible-api.com for the Bible and the bcbooks
//! scriptures JSON for the other volumes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;
use tracing::{debug, info};

use super::ResolveError;
use super::reference::{ParsedQuery, Volume, normalize_title};
use crate::model::{Locator, SlideContent};

const BIBLE_API: &str = "https://bible-api.com";
const DATASET_BASE: &str = "https://raw.githubusercontent.com/bcbooks/scriptures-json/master";

fn dataset_url(volume: Volume) -> Option<String> {
    let file = match volume {
        Volume::Bible => return None,
        Volume::BookOfMormon => "book-of-mormon.json",
        Volume::DoctrineAndCovenants => "doctrine-and-covenants.json",
        Volume::PearlOfGreatPrice => "pearl-of-great-price.json",
    };
    Some(format!("{DATASET_BASE}/{file}"))
}

/// One volume of the bcbooks dataset. Depending on the volume the chapters
/// sit under `books`, under `sections` or at the root.
#[derive(Debug, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub books: Vec<DatasetBook>,
    #[serde(default)]
    pub sections: Vec<DatasetChapter>,
    #[serde(default)]
    pub chapters: Vec<DatasetChapter>,
}

#[derive(Debug, Deserialize)]
pub struct DatasetBook {
    pub book: String,
    #[serde(default)]
    pub chapters: Vec<DatasetChapter>,
}

#[derive(Debug, Deserialize)]
pub struct DatasetChapter {
    #[serde(default)]
    pub chapter: Option<u32>,
    #[serde(default)]
    pub section: Option<u32>,
    #[serde(default)]
    pub verses: Vec<DatasetVerse>,
}

impl DatasetChapter {
    fn number(&self) -> Option<u32> {
        self.chapter.or(self.section)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatasetVerse {
    pub verse: u32,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct BibleApiResponse {
    reference: String,
    text: String,
    verses: Vec<BibleApiVerse>,
}

#[derive(Debug, Deserialize)]
struct BibleApiVerse {
    book_name: String,
    chapter: u32,
    verse: u32,
}

/// Locate a verse in a downloaded dataset.
pub fn find_verse(
    dataset: &Dataset,
    volume: Volume,
    book: &str,
    chapter: u32,
    verse: u32,
) -> Result<SlideContent, ResolveError> {
    let wanted = normalize_title(book);
    let is_dc = volume == Volume::DoctrineAndCovenants;

    // Exact title first so "mormon" does not land in "Words of Mormon".
    let by_title = dataset
        .books
        .iter()
        .find(|b| normalize_title(&b.book) == wanted)
        .or_else(|| {
            dataset.books.iter().find(|b| {
                let title = normalize_title(&b.book);
                title.contains(&wanted) || wanted.contains(&title)
            })
        })
        .or_else(|| if is_dc { dataset.books.first() } else { None });

    let (chapters, title) = if let Some(found) = by_title {
        (found.chapters.as_slice(), found.book.clone())
    } else if is_dc && !dataset.sections.is_empty() {
        (dataset.sections.as_slice(), "Doctrine and Covenants".to_string())
    } else if !dataset.chapters.is_empty() {
        let title = if is_dc {
            "Doctrine and Covenants".to_string()
        } else {
            book.to_string()
        };
        (dataset.chapters.as_slice(), title)
    } else {
        return Err(ResolveError::NotFound(format!(
            "Could not locate chapters for {book}."
        )));
    };

    let unit = if is_dc { "Section" } else { "Chapter" };
    let found_chapter = chapters
        .iter()
        .find(|c| c.number() == Some(chapter))
        .ok_or_else(|| ResolveError::NotFound(format!("{unit} {chapter} not found.")))?;
    let found_verse = found_chapter
        .verses
        .iter()
        .find(|v| v.verse == verse)
        .ok_or_else(|| ResolveError::NotFound(format!("Verse {verse} not found.")))?;

    Ok(SlideContent {
        reference: format!("{title} {chapter}:{verse}"),
        body: found_verse.text.trim().to_string(),
        source_label: volume.label().to_string(),
        locator: Locator {
            book: title,
            chapter,
            verse,
        },
        tags: Vec::new(),
    })
}

fn bible_slide(response: BibleApiResponse) -> Result<SlideContent, ResolveError> {
    let first = response
        .verses
        .first()
        .ok_or_else(|| ResolveError::NotFound("Not in Bible API".to_string()))?;
    let body = response
        .text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    Ok(SlideContent {
        reference: response.reference.clone(),
        body,
        source_label: Volume::Bible.label().to_string(),
        locator: Locator {
            book: first.book_name.clone(),
            chapter: first.chapter,
            verse: first.verse,
        },
        tags: Vec::new(),
    })
}

/// Percent-encode one URL path segment.
fn encode_segment(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b':' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn http_error(err: ureq::Error, what: &str) -> ResolveError {
    match err {
        ureq::Error::StatusCode(404) => ResolveError::NotFound(format!("Not in {what}")),
        ureq::Error::StatusCode(code) => {
            ResolveError::Upstream(format!("{what} returned HTTP {code}"))
        }
        ureq::Error::HostNotFound
        | ureq::Error::ConnectionFailed
        | ureq::Error::Io(_)
        | ureq::Error::Timeout(_) => ResolveError::Offline,
        other => ResolveError::Upstream(format!("{what}: {other}")),
    }
}

/// Network tier of the resolver. Datasets are downloaded once per process.
#[derive(Default)]
pub struct PublicSources {
    datasets: Mutex<HashMap<Volume, Arc<Dataset>>>,
}

impl PublicSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cached(&self, volume: Volume) -> bool {
        self.datasets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&volume)
    }

    pub fn fetch(&self, query: &ParsedQuery, volume: Volume) -> Result<SlideContent, ResolveError> {
        match volume {
            Volume::Bible => self.fetch_bible(query),
            _ => {
                let dataset = self.dataset(volume)?;
                find_verse(&dataset, volume, &query.book, query.chapter, query.verse)
            }
        }
    }

    fn fetch_bible(&self, query: &ParsedQuery) -> Result<SlideContent, ResolveError> {
        let reference = format!("{} {}:{}", query.book, query.chapter, query.verse);
        let url = format!("{BIBLE_API}/{}?translation=kjv", encode_segment(&reference));
        debug!(%url, "Querying Bible API");
        let response: BibleApiResponse = ureq::get(&url)
            .call()
            .map_err(|e| http_error(e, "Bible API"))?
            .body_mut()
            .read_json()
            .map_err(|e| http_error(e, "Bible API"))?;
        bible_slide(response)
    }

    fn dataset(&self, volume: Volume) -> Result<Arc<Dataset>, ResolveError> {
        if let Some(cached) = self
            .datasets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&volume)
        {
            return Ok(cached.clone());
        }

        let url = dataset_url(volume)
            .ok_or_else(|| ResolveError::NotFound("Unknown book volume".to_string()))?;
        info!(volume = volume.label(), "Downloading scripture dataset");
        let dataset: Dataset = ureq::get(&url)
            .call()
            .map_err(|e| http_error(e, volume.label()))?
            .body_mut()
            .with_config()
            .limit(64 * 1024 * 1024)
            .read_json()
            .map_err(|e| http_error(e, volume.label()))?;

        let dataset = Arc::new(dataset);
        self.datasets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(volume, dataset.clone());
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_of_mormon() -> Dataset {
        serde_json::from_str(
            r#"{
                "books": [
                    { "book": "1 Nephi", "chapters": [
                        { "chapter": 3, "reference": "1 Nephi 3", "verses": [
                            { "verse": 7, "text": "I will go and do the things which the Lord hath commanded." }
                        ]}
                    ]},
                    { "book": "Words of Mormon", "chapters": [
                        { "chapter": 1, "verses": [{ "verse": 1, "text": "And now I, Mormon" }] }
                    ]},
                    { "book": "Mormon", "chapters": [
                        { "chapter": 9, "verses": [{ "verse": 21, "text": "Behold, I say unto you" }] }
                    ]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_find_verse_in_books() {
        let slide = find_verse(&book_of_mormon(), Volume::BookOfMormon, "1 nephi", 3, 7).unwrap();
        assert_eq!(slide.reference, "1 Nephi 3:7");
        assert_eq!(slide.source_label, "Book of Mormon");
        assert_eq!(slide.locator.book, "1 Nephi");
    }

    #[test]
    fn test_exact_title_beats_substring() {
        let slide = find_verse(&book_of_mormon(), Volume::BookOfMormon, "mormon", 9, 21).unwrap();
        assert_eq!(slide.reference, "Mormon 9:21");
    }

    #[test]
    fn test_missing_chapter_and_verse() {
        let data = book_of_mormon();
        match find_verse(&data, Volume::BookOfMormon, "1 nephi", 4, 1) {
            Err(ResolveError::NotFound(msg)) => assert_eq!(msg, "Chapter 4 not found."),
            other => panic!("unexpected: {other:?}"),
        }
        match find_verse(&data, Volume::BookOfMormon, "1 nephi", 3, 99) {
            Err(ResolveError::NotFound(msg)) => assert_eq!(msg, "Verse 99 not found."),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_doctrine_and_covenants_sections() {
        let data: Dataset = serde_json::from_str(
            r#"{ "sections": [
                { "section": 4, "verses": [
                    { "verse": 2, "text": "Therefore, O ye that embark in the service of God" }
                ]}
            ]}"#,
        )
        .unwrap();
        let slide = find_verse(
            &data,
            Volume::DoctrineAndCovenants,
            "doctrine and covenants",
            4,
            2,
        )
        .unwrap();
        assert_eq!(slide.reference, "Doctrine and Covenants 4:2");
        assert_eq!(slide.source_label, "D&C");

        match find_verse(&data, Volume::DoctrineAndCovenants, "doctrine and covenants", 5, 1) {
            Err(ResolveError::NotFound(msg)) => assert_eq!(msg, "Section 5 not found."),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_dashed_pearl_titles_match() {
        let data: Dataset = serde_json::from_str(
            "{ \"books\": [ { \"book\": \"Joseph Smith\u{2014}Matthew\", \"chapters\": [
                { \"chapter\": 1, \"verses\": [ { \"verse\": 4, \"text\": \"Take heed\" } ] }
            ] } ] }",
        )
        .unwrap();
        let slide = find_verse(
            &data,
            Volume::PearlOfGreatPrice,
            "joseph smith-matthew",
            1,
            4,
        )
        .unwrap();
        assert_eq!(slide.body, "Take heed");
    }

    #[test]
    fn test_empty_dataset() {
        let result = find_verse(&Dataset::default(), Volume::PearlOfGreatPrice, "moses", 1, 39);
        assert!(matches!(result, Err(ResolveError::NotFound(_))));
    }

    #[test]
    fn test_bible_api_response() {
        let response: BibleApiResponse = serde_json::from_str(
            r#"{
                "reference": "John 3:16",
                "verses": [{ "book_id": "JHN", "book_name": "John", "chapter": 3, "verse": 16,
                             "text": "For God so loved the world,\n" }],
                "text": "For God so loved the world,\nthat he gave his only begotten Son\n",
                "translation_id": "kjv"
            }"#,
        )
        .unwrap();
        let slide = bible_slide(response).unwrap();
        assert_eq!(slide.reference, "John 3:16");
        assert_eq!(
            slide.body,
            "For God so loved the world, that he gave his only begotten Son"
        );
        assert_eq!(slide.source_label, "KJV");
        assert_eq!(slide.locator.chapter, 3);
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("1 john 1:9"), "1%20john%201:9");
        assert_eq!(encode_segment("song of solomon 2:1"), "song%20of%20solomon%202:1");
    }

    #[test]
    fn test_dataset_urls() {
        assert!(dataset_url(Volume::Bible).is_none());
        assert!(
            dataset_url(Volume::BookOfMormon)
                .unwrap()
                .ends_with("/book-of-mormon.json")
        );
    }
}
