//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep method signatures and thread identifiers from
//! being mixed up with thread names or raw resource strings.

use std::borrow::Borrow;
use std::fmt;

use stackscope_common::StackFrame;

/// Thread ID
///
/// Identifier assigned by the monitored process, used for CPU time queries.
/// Thread names, not ids, key the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

/// Method signature in `Class.method()` form
///
/// Keys hot-spot entries and call-tree children. Frames of the same method at
/// different lines share one signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodSignature(String);

impl MethodSignature {
    /// Build the signature for a class and method name.
    pub fn new(class_name: &str, method_name: &str) -> Self {
        Self(format!("{class_name}.{method_name}()"))
    }

    /// Get the signature as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&StackFrame> for MethodSignature {
    fn from(frame: &StackFrame) -> Self {
        Self::new(&frame.class_name, &frame.method_name)
    }
}

impl Borrow<str> for MethodSignature {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_signature_format() {
        let sig = MethodSignature::new("com.example.Server", "handle");
        assert_eq!(sig.as_str(), "com.example.Server.handle()");
        assert_eq!(sig.to_string(), "com.example.Server.handle()");
    }

    #[test]
    fn test_signature_ignores_line_number() {
        let a = StackFrame::new("A", "m").with_location("A.java", 1);
        let b = StackFrame::new("A", "m").with_location("A.java", 2);
        assert_eq!(MethodSignature::from(&a), MethodSignature::from(&b));
    }

    #[test]
    fn test_signature_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(MethodSignature::new("A", "m"), 1);
        assert_eq!(map.get("A.m()"), Some(&1));
    }

    #[test]
    fn test_thread_id_display() {
        assert_eq!(ThreadId(42).to_string(), "TID:42");
    }
}
