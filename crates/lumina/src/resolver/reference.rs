//! Free-text scripture references: parsing, book abbreviations and verse
//! stepping.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Abbreviation → canonical (lower-case) book name. Every book of the
/// standard works has at least two spellings.
const BOOK_ALIASES: &[(&str, &str)] = &[
    // Old Testament
    ("gn", "genesis"), ("gen", "genesis"), ("genesis", "genesis"),
    ("ex", "exodus"), ("exo", "exodus"), ("exodus", "exodus"),
    ("lev", "leviticus"), ("lv", "leviticus"), ("leviticus", "leviticus"),
    ("num", "numbers"), ("nm", "numbers"), ("numb", "numbers"), ("numbers", "numbers"),
    ("deut", "deuteronomy"), ("dt", "deuteronomy"), ("deuteronomy", "deuteronomy"),
    ("josh", "joshua"), ("jos", "joshua"), ("joshua", "joshua"),
    ("judg", "judges"), ("jdg", "judges"), ("judges", "judges"),
    ("ruth", "ruth"), ("ru", "ruth"), ("rut", "ruth"),
    ("1sam", "1 samuel"), ("1sm", "1 samuel"), ("1sa", "1 samuel"), ("1samuel", "1 samuel"),
    ("2sam", "2 samuel"), ("2sm", "2 samuel"), ("2sa", "2 samuel"), ("2samuel", "2 samuel"),
    ("1kgs", "1 kings"), ("1kg", "1 kings"), ("1ki", "1 kings"), ("1kings", "1 kings"),
    ("2kgs", "2 kings"), ("2kg", "2 kings"), ("2ki", "2 kings"), ("2kings", "2 kings"),
    ("1chr", "1 chronicles"), ("1ch", "1 chronicles"), ("1chronicles", "1 chronicles"),
    ("2chr", "2 chronicles"), ("2ch", "2 chronicles"), ("2chronicles", "2 chronicles"),
    ("ezra", "ezra"), ("ezr", "ezra"),
    ("neh", "nehemiah"), ("ne", "nehemiah"), ("nehemiah", "nehemiah"),
    ("esth", "esther"), ("es", "esther"), ("est", "esther"), ("esther", "esther"),
    ("job", "job"), ("jb", "job"),
    ("ps", "psalms"), ("psm", "psalms"), ("psalm", "psalms"), ("psalms", "psalms"),
    ("prov", "proverbs"), ("pr", "proverbs"), ("pro", "proverbs"), ("proverbs", "proverbs"),
    ("eccl", "ecclesiastes"), ("ec", "ecclesiastes"), ("qoh", "ecclesiastes"),
    ("ecclesiastes", "ecclesiastes"),
    ("song", "song of solomon"), ("sos", "song of solomon"), ("canticles", "song of solomon"),
    ("song of solomon", "song of solomon"),
    ("isa", "isaiah"), ("is", "isaiah"), ("isaiah", "isaiah"),
    ("jer", "jeremiah"), ("jr", "jeremiah"), ("jeremiah", "jeremiah"),
    ("lam", "lamentations"), ("lm", "lamentations"), ("lamentations", "lamentations"),
    ("ezek", "ezekiel"), ("ez", "ezekiel"), ("ezekiel", "ezekiel"),
    ("dan", "daniel"), ("dn", "daniel"), ("daniel", "daniel"),
    ("hos", "hosea"), ("ho", "hosea"), ("hosea", "hosea"),
    ("joel", "joel"), ("jl", "joel"),
    ("amos", "amos"), ("am", "amos"),
    ("obad", "obadiah"), ("ob", "obadiah"), ("obadiah", "obadiah"),
    ("jonah", "jonah"), ("jnh", "jonah"), ("jon", "jonah"),
    ("mic", "micah"), ("mc", "micah"), ("micah", "micah"),
    ("nah", "nahum"), ("na", "nahum"), ("nahum", "nahum"),
    ("hab", "habakkuk"), ("hb", "habakkuk"), ("habakkuk", "habakkuk"),
    ("zeph", "zephaniah"), ("zp", "zephaniah"), ("zephaniah", "zephaniah"),
    ("hag", "haggai"), ("hg", "haggai"), ("haggai", "haggai"),
    ("zech", "zechariah"), ("zc", "zechariah"), ("zechariah", "zechariah"),
    ("mal", "malachi"), ("ml", "malachi"), ("malachi", "malachi"),
    // New Testament
    ("matt", "matthew"), ("mt", "matthew"), ("mat", "matthew"), ("matthew", "matthew"),
    ("mk", "mark"), ("mrk", "mark"), ("mar", "mark"), ("mark", "mark"),
    ("lk", "luke"), ("luk", "luke"), ("lu", "luke"), ("luke", "luke"),
    ("jh", "john"), ("jn", "john"), ("jhn", "john"), ("joh", "john"), ("john", "john"),
    ("acts", "acts"), ("ac", "acts"), ("act", "acts"),
    ("rom", "romans"), ("rm", "romans"), ("romans", "romans"),
    ("1cor", "1 corinthians"), ("1co", "1 corinthians"), ("1corinthians", "1 corinthians"),
    ("2cor", "2 corinthians"), ("2co", "2 corinthians"), ("2corinthians", "2 corinthians"),
    ("gal", "galatians"), ("ga", "galatians"), ("galatians", "galatians"),
    ("eph", "ephesians"), ("ep", "ephesians"), ("ephesians", "ephesians"),
    ("phil", "philippians"), ("php", "philippians"), ("philippians", "philippians"),
    ("col", "colossians"), ("cl", "colossians"), ("colossians", "colossians"),
    ("1thess", "1 thessalonians"), ("1th", "1 thessalonians"),
    ("1thessalonians", "1 thessalonians"),
    ("2thess", "2 thessalonians"), ("2th", "2 thessalonians"),
    ("2thessalonians", "2 thessalonians"),
    ("1tim", "1 timothy"), ("1ti", "1 timothy"), ("1timothy", "1 timothy"),
    ("2tim", "2 timothy"), ("2ti", "2 timothy"), ("2timothy", "2 timothy"),
    ("tit", "titus"), ("ti", "titus"), ("titus", "titus"),
    ("phlm", "philemon"), ("phm", "philemon"), ("philemon", "philemon"),
    ("heb", "hebrews"), ("hebr", "hebrews"), ("hebrews", "hebrews"),
    ("jam", "james"), ("jas", "james"), ("james", "james"),
    ("1pet", "1 peter"), ("1pe", "1 peter"), ("1peter", "1 peter"),
    ("2pet", "2 peter"), ("2pe", "2 peter"), ("2peter", "2 peter"),
    ("1jn", "1 john"), ("1jo", "1 john"), ("1john", "1 john"),
    ("2jn", "2 john"), ("2jo", "2 john"), ("2john", "2 john"),
    ("3jn", "3 john"), ("3jo", "3 john"), ("3john", "3 john"),
    ("jude", "jude"), ("jd", "jude"), ("jud", "jude"),
    ("rev", "revelation"), ("rv", "revelation"), ("revelation", "revelation"),
    // Book of Mormon
    ("1ne", "1 nephi"), ("1nephi", "1 nephi"),
    ("2ne", "2 nephi"), ("2nephi", "2 nephi"),
    ("jac", "jacob"), ("jacob", "jacob"), ("jc", "jacob"),
    ("enos", "enos"), ("en", "enos"),
    ("jarom", "jarom"), ("jar", "jarom"),
    ("omni", "omni"), ("om", "omni"),
    ("wom", "words of mormon"), ("wofm", "words of mormon"), ("words", "words of mormon"),
    ("words of mormon", "words of mormon"),
    ("mos", "mosiah"), ("mosiah", "mosiah"),
    ("al", "alma"), ("alma", "alma"),
    ("hel", "helaman"), ("helaman", "helaman"), ("he", "helaman"),
    ("3ne", "3 nephi"), ("3nephi", "3 nephi"),
    ("4ne", "4 nephi"), ("4nephi", "4 nephi"),
    ("morm", "mormon"), ("mormon", "mormon"), ("mrm", "mormon"),
    ("eth", "ether"), ("ether", "ether"),
    ("moro", "moroni"), ("moroni", "moroni"),
    // Doctrine and Covenants ("&" has already become "and")
    ("dc", "doctrine and covenants"), ("dandc", "doctrine and covenants"),
    ("doc", "doctrine and covenants"), ("doctrine and covenants", "doctrine and covenants"),
    // Pearl of Great Price
    ("moses", "moses"), ("mse", "moses"),
    ("abr", "abraham"), ("abraham", "abraham"), ("ab", "abraham"),
    ("jsm", "joseph smith-matthew"), ("js-m", "joseph smith-matthew"),
    ("joseph smith-matthew", "joseph smith-matthew"),
    ("joseph smith-mathew", "joseph smith-matthew"),
    ("jsh", "joseph smith-history"), ("js-h", "joseph smith-history"),
    ("joseph smith-history", "joseph smith-history"),
    ("aof", "articles of faith"), ("art", "articles of faith"), ("articles", "articles of faith"),
    ("articles of faith", "articles of faith"),
];

static BOOKS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| BOOK_ALIASES.iter().copied().collect());

static QUERY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d*)?\s*([a-z\s-]+?)\s*(\d+)[:.\s]*(\d+)$").expect("valid query regex")
});

static DASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*-\s*").expect("valid dash regex"));

static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)\s+(\d+):(\d+)$").expect("valid reference regex"));

const BIBLE_BOOKS: &[&str] = &[
    "matthew", "mark", "luke", "john", "acts", "romans", "corinthians", "galatians",
    "ephesians", "philippians", "colossians", "thessalonians", "timothy", "titus", "philemon",
    "hebrews", "james", "peter", "jude", "revelation", "genesis", "exodus", "leviticus",
    "numbers", "deuteronomy", "joshua", "judges", "ruth", "samuel", "kings", "chronicles",
    "ezra", "nehemiah", "esther", "job", "psalms", "proverbs", "ecclesiastes", "solomon",
    "isaiah", "jeremiah", "lamentations", "ezekiel", "daniel", "hosea", "joel", "amos",
    "obadiah", "jonah", "micah", "nahum", "habakkuk", "zephaniah", "haggai", "zechariah",
    "malachi",
];

const BOOK_OF_MORMON_BOOKS: &[&str] = &[
    "nephi", "mosiah", "alma", "helaman", "ether", "moroni", "jacob", "enos", "jarom", "omni",
    "mormon",
];

const PEARL_BOOKS: &[&str] = &["moses", "abraham", "articles", "joseph smith"];

/// Which collection a book belongs to; decides the public source queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Volume {
    Bible,
    BookOfMormon,
    DoctrineAndCovenants,
    PearlOfGreatPrice,
}

impl Volume {
    /// Label shown under the verse.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bible => "KJV",
            Self::BookOfMormon => "Book of Mormon",
            Self::DoctrineAndCovenants => "D&C",
            Self::PearlOfGreatPrice => "Pearl of Great Price",
        }
    }

    /// Needs the one-off dataset download rather than a per-verse request.
    pub fn is_dataset(&self) -> bool {
        !matches!(self, Self::Bible)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    /// Canonical lower-case book name, or the raw text when unknown.
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
}

impl ParsedQuery {
    /// `None` for books outside the standard works.
    pub fn volume(&self) -> Option<Volume> {
        let book = self.book.as_str();
        if BIBLE_BOOKS.iter().any(|b| book.contains(b)) && !book.contains("joseph smith") {
            Some(Volume::Bible)
        } else if BOOK_OF_MORMON_BOOKS.iter().any(|b| book.contains(b)) {
            Some(Volume::BookOfMormon)
        } else if book.contains("doctrine") {
            Some(Volume::DoctrineAndCovenants)
        } else if PEARL_BOOKS.iter().any(|b| book.contains(b)) {
            Some(Volume::PearlOfGreatPrice)
        } else {
            None
        }
    }
}

/// Lower-case, unify dashes and `&`, and drop spaces around hyphens, so
/// "Joseph Smith — Matthew" and "joseph smith-matthew" compare equal.
pub fn normalize_title(text: &str) -> String {
    let lowered = text
        .trim()
        .to_lowercase()
        .replace(['\u{2014}', '\u{2013}'], "-")
        .replace('&', "and");
    DASH_RE.replace_all(&lowered, "-").into_owned()
}

/// Parse "1 Nephi 3:7", "mat4:5", "D&C 4 2" and similar.
pub fn parse_query(query: &str) -> Option<ParsedQuery> {
    let clean = normalize_title(query);
    let caps = QUERY_RE.captures(&clean)?;

    let leading = caps.get(1).map_or("", |m| m.as_str());
    let book_text = caps.get(2)?.as_str();
    let chapter = caps.get(3)?.as_str().parse().ok()?;
    let verse = caps.get(4)?.as_str().parse().ok()?;

    let raw_book = format!("{leading}{book_text}")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let book = BOOKS
        .get(raw_book.as_str())
        .or_else(|| BOOKS.get(raw_book.replace(' ', "").as_str()))
        .map(|b| b.to_string())
        .unwrap_or(raw_book);

    Some(ParsedQuery {
        book,
        chapter,
        verse,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Neighbouring reference of a displayed `Book C:V` reference. `None` for
/// references without a verse and when stepping back from verse 1.
pub fn step(reference: &str, direction: Direction) -> Option<String> {
    let caps = REFERENCE_RE.captures(reference.trim())?;
    let book = caps.get(1)?.as_str();
    let chapter: u32 = caps.get(2)?.as_str().parse().ok()?;
    let verse: u32 = caps.get(3)?.as_str().parse().ok()?;
    let verse = match direction {
        Direction::Next => verse.checked_add(1)?,
        Direction::Prev => verse.checked_sub(1).filter(|v| *v >= 1)?,
    };
    Some(format!("{book} {chapter}:{verse}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(book: &str, chapter: u32, verse: u32) -> Option<ParsedQuery> {
        Some(ParsedQuery {
            book: book.to_string(),
            chapter,
            verse,
        })
    }

    #[test]
    fn test_parse_common_forms() {
        assert_eq!(parse_query("1 Nephi 3:7"), parsed("1 nephi", 3, 7));
        assert_eq!(parse_query("  John 3:16 "), parsed("john", 3, 16));
        assert_eq!(parse_query("Mat4:5"), parsed("matthew", 4, 5));
        assert_eq!(parse_query("ps 23 1"), parsed("psalms", 23, 1));
        assert_eq!(parse_query("alma 32.21"), parsed("alma", 32, 21));
    }

    #[test]
    fn test_parse_abbreviations() {
        assert_eq!(parse_query("1ne 3:7"), parsed("1 nephi", 3, 7));
        assert_eq!(parse_query("1 Cor 13:4"), parsed("1 corinthians", 13, 4));
        assert_eq!(parse_query("D&C 4:2"), parsed("doctrine and covenants", 4, 2));
        assert_eq!(parse_query("dc 121:7"), parsed("doctrine and covenants", 121, 7));
        assert_eq!(parse_query("wofm 1:7"), parsed("words of mormon", 1, 7));
        assert_eq!(parse_query("aof 1:13"), parsed("articles of faith", 1, 13));
    }

    #[test]
    fn test_parse_dashed_titles() {
        let expected = parsed("joseph smith-matthew", 1, 4);
        assert_eq!(parse_query("Joseph Smith\u{2014}Matthew 1:4"), expected);
        assert_eq!(parse_query("Joseph Smith - Matthew 1:4"), expected);
        assert_eq!(parse_query("JS-H 1:17"), parsed("joseph smith-history", 1, 17));
    }

    #[test]
    fn test_parse_unknown_book_kept_raw() {
        assert_eq!(parse_query("Gospel of Thomas 1:1"), parsed("gospel of thomas", 1, 1));
        assert_eq!(parse_query("Gospel of Thomas 1:1").unwrap().volume(), None);
    }

    #[test]
    fn test_parse_rejects_non_references() {
        assert_eq!(parse_query("faith"), None);
        assert_eq!(parse_query("John 3"), None);
        assert_eq!(parse_query(""), None);
        assert_eq!(parse_query("3:16"), None);
    }

    #[test]
    fn test_volume_classification() {
        let volume = |q: &str| parse_query(q).and_then(|p| p.volume());
        assert_eq!(volume("John 3:16"), Some(Volume::Bible));
        assert_eq!(volume("1 John 1:9"), Some(Volume::Bible));
        assert_eq!(volume("Alma 32:21"), Some(Volume::BookOfMormon));
        assert_eq!(volume("Words of Mormon 1:7"), Some(Volume::BookOfMormon));
        assert_eq!(volume("D&C 4:2"), Some(Volume::DoctrineAndCovenants));
        assert_eq!(volume("Moses 1:39"), Some(Volume::PearlOfGreatPrice));
        // Contains "matthew" but is not the Bible.
        assert_eq!(volume("JS-M 1:4"), Some(Volume::PearlOfGreatPrice));
    }

    #[test]
    fn test_step_navigation() {
        assert_eq!(step("1 Nephi 3:7", Direction::Next).as_deref(), Some("1 Nephi 3:8"));
        assert_eq!(step("1 Nephi 3:7", Direction::Prev).as_deref(), Some("1 Nephi 3:6"));
        assert_eq!(
            step("Doctrine and Covenants 4:2", Direction::Prev).as_deref(),
            Some("Doctrine and Covenants 4:1")
        );
        assert_eq!(step("John 5:1", Direction::Prev), None);
        assert_eq!(step("Welcome", Direction::Next), None);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Joseph Smith\u{2014}History"), "joseph smith-history");
        assert_eq!(normalize_title("D&C"), "dandc");
    }
}
