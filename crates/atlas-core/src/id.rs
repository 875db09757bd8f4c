use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for element IDs.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Counter behind locally minted (not yet persisted) IDs.
static LOCAL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A stable identifier for an element in an outline tree.
///
/// Server-assigned IDs are interned verbatim; elements created on the client
/// before the backend confirms them get a `local_<n>` ID. Internally a `Spur`
/// index: 4 bytes, Copy, Eq, Hash in O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(Spur);

impl ElementId {
    /// Intern a string as an ElementId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        ElementId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Mint a fresh local ID for an optimistic element.
    pub fn local() -> Self {
        let n = LOCAL_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("local_{n}"))
    }

    /// Whether this ID was minted on the client and never came from the server.
    pub fn is_local(&self) -> bool {
        self.as_str().starts_with("local_")
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ElementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Backends hand out numeric ids as often as strings.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(u64),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Str(s) => ElementId::intern(&s),
            Raw::Num(n) => ElementId::intern(&n.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = ElementId::intern("el-42");
        let b = ElementId::intern("el-42");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "el-42");
    }

    #[test]
    fn local_ids_are_unique() {
        let a = ElementId::local();
        let b = ElementId::local();
        assert_ne!(a, b);
        assert!(a.is_local());
        assert!(!ElementId::intern("17").is_local());
    }

    #[test]
    fn numeric_ids_deserialize() {
        let id: ElementId = serde_json::from_str("17").unwrap();
        assert_eq!(id, ElementId::intern("17"));
        let id: ElementId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.as_str(), "abc");
    }
}
