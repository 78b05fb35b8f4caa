//! Dataref path grammar.
//!
//! ```text
//! some/path          scalar (float by default)
//! some/path[6]       element 6 of an array-valued dataref
//! some/path:d        explicit type suffix, one of d i f s b
//! data:some/key      internal value, computed locally, never monitored
//! ```
//!
//! The type suffix is stripped before the path is used as a canonical
//! key; the array index stays part of the key (`some/path[6]`), with the
//! base path (`some/path`) kept alongside for wildcard matching.

use log::warn;

/// Prefix marking internal datarefs (never forwarded to the simulator).
pub const INTERNAL_PREFIX: &str = "data:";

/// Declared semantic type of a dataref value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    #[default]
    Float,
    Int,
    Str,
    Bytes,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Str => "str",
            Self::Bytes => "bytes",
        }
    }
}

/// A parsed dataref path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatarefPath {
    /// Canonical path, type suffix stripped, index retained.
    pub path: String,
    /// Path without the array index.
    pub base: String,
    /// Array index, when the path addresses one array element.
    pub index: Option<usize>,
    pub data_type: DataType,
    pub is_decimal: bool,
    pub is_string: bool,
}

impl DatarefPath {
    /// Parse a path specification. Integrity problems (conflicting type
    /// declarations) are logged warnings, never failures: the path is
    /// still usable with best-effort semantics.
    pub fn parse(spec: &str) -> Self {
        let mut is_decimal = false;
        let mut is_string = false;
        let mut data_type = DataType::Float;

        // Type suffix: "path:t" with t in {d,i,f,s,b}. The "data:" prefix
        // uses the same separator, so require the colon near the end.
        let mut path = spec.to_owned();
        if spec.len() > 3 {
            let bytes = spec.as_bytes();
            if bytes[spec.len() - 2] == b':' {
                match bytes[spec.len() - 1] {
                    b'd' => {
                        is_decimal = true;
                        data_type = DataType::Int;
                        path.truncate(spec.len() - 2);
                    }
                    b'i' => {
                        data_type = DataType::Int;
                        path.truncate(spec.len() - 2);
                    }
                    b'f' => {
                        data_type = DataType::Float;
                        path.truncate(spec.len() - 2);
                    }
                    b's' => {
                        is_string = true;
                        data_type = DataType::Str;
                        path.truncate(spec.len() - 2);
                    }
                    b'b' => {
                        data_type = DataType::Bytes;
                        path.truncate(spec.len() - 2);
                    }
                    _ => {}
                }
            }
        }

        if is_decimal && is_string {
            warn!("{path}: cannot be both decimal and string, using decimal");
            is_string = false;
            data_type = DataType::Int;
        }

        // Array element: some/path[6]
        let (base, index) = match (path.find('['), path.rfind(']')) {
            (Some(open), Some(close)) if close > open + 1 => {
                match path[open + 1..close].parse::<usize>() {
                    Ok(idx) => (path[..open].to_owned(), Some(idx)),
                    Err(_) => {
                        warn!("{path}: malformed array index, treating as scalar");
                        (path.clone(), None)
                    }
                }
            }
            _ => (path.clone(), None),
        };

        Self {
            path,
            base,
            index,
            data_type,
            is_decimal,
            is_string,
        }
    }

    /// Whether this is an internal (locally computed) dataref.
    pub fn is_internal(&self) -> bool {
        self.path.starts_with(INTERNAL_PREFIX)
    }

    /// Prefix a path to make it internal.
    pub fn mk_internal(path: &str) -> String {
        format!("{INTERNAL_PREFIX}{path}")
    }

    /// The `base[*]` wildcard key matching every index of this array
    /// path, or `None` for scalar paths.
    pub fn wildcard(&self) -> Option<String> {
        self.index.map(|_| format!("{}[*]", self.base))
    }
}
