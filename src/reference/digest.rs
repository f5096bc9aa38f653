use crate::errors::ImageError;
use regex::Regex;
use std::{fmt, str, str::FromStr};

/// A digest securely identifies the specific contents of a binary object
///
/// Digests include the hash format, which is currently always `sha256`
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest {
    serialized: String,
}

impl ContentDigest {
    /// Returns a reference to the existing string representation of a
    /// [ContentDigest]
    ///
    /// This string always has a single colon. After the colon is 32 or more
    /// characters which will always be lowercase hexadecimal digits. The
    /// format specifier before this colon is alphanumeric, with plus, dash,
    /// underscore, or dot characters allowed as separators between valid
    /// groups of alphanumeric characters.
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Create a new [ContentDigest] from parts
    ///
    /// The format string and hex string are assembled and parsed.
    pub fn from_parts(format_part: &str, hex_part: &str) -> Result<Self, ImageError> {
        ContentDigest::parse(&format!("{}:{}", format_part, hex_part))
    }

    /// Parse a [prim@str] as a [ContentDigest]
    pub fn parse(s: &str) -> Result<Self, ImageError> {
        lazy_static! {
            static ref RE: Regex =
                Regex::new(&format!("^{}$", ContentDigest::regex_str())).unwrap();
        }
        match RE.is_match(s) {
            false => Err(ImageError::InvalidReferenceFormat(s.to_owned())),
            true => Ok(ContentDigest {
                serialized: s.to_owned(),
            }),
        }
    }

    /// Return a reference to the format string portion of this digest.
    ///
    /// Currently this is `sha256` for all digests we create or recognize.
    pub fn format_str(&self) -> &str {
        self.serialized
            .splitn(2, ':')
            .next()
            .expect("already parsed")
    }

    /// Return a reference to the hexadecimal string portion of this digest.
    pub fn hex_str(&self) -> &str {
        self.serialized
            .splitn(2, ':')
            .nth(1)
            .expect("already parsed")
    }

    /// Does a user-supplied image ID refer to this digest?
    ///
    /// Accepts the full serialized form, the bare hex string, or any prefix
    /// of the hex string (a short ID). An empty string never matches.
    pub fn matches_id(&self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        let mut parts = id.splitn(2, ':');
        match (parts.next(), parts.next()) {
            (Some(format_part), Some(hex_part)) => {
                format_part == self.format_str() && self.hex_str().starts_with(hex_part)
            }
            _ => self.hex_str().starts_with(id),
        }
    }

    pub(crate) fn regex_str() -> &'static str {
        concat!(
            "(?P<dig>", // digest group
            /*  */ "(?P<dig_f>", // digest format group
            /* -- */ "(?:", // first format component
            /* -- -- */ "[a-zA-Z]",
            /* -- -- */ "[a-zA-Z0-9]*",
            /* -- */ ")",
            /* -- */ "(?:", // additional format components
            /* -- -- */ "[-_+.]", // separators allowed in the digest format
            /* -- -- */ "[a-zA-Z]",
            /* -- -- */ "[a-zA-Z0-9]*",
            /* -- */ ")*",
            /*  */ ")", // end digest format group
            /*  */ "[:]", // Main separator
            /*  */ "(?P<dig_h>", // digest hex group
            /* -- */ "[a-f0-9]{32,}",
            /*  */ ")",
            ")",
        )
    }
}

impl FromStr for ContentDigest {
    type Err = ImageError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentDigest::parse(s)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
