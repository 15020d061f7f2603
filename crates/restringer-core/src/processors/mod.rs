//! Obfuscation-family processor bundles: ordered rule lists applied
//! before and after the main deobfuscation loop, selected by a
//! marker-based detector. Preprocessors and postprocessors never mix.

pub mod augmented_array;
pub mod caesar_plus;
pub mod function_to_array;
pub mod obfuscator_io;

use crate::rules::NamedRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObfuscationKind {
    ObfuscatorIo,
    AugmentedArray,
    FunctionToArray,
    CaesarPlus,
}

pub struct Processor {
    pub kind: ObfuscationKind,
    pub preprocessors: Vec<NamedRule>,
    pub postprocessors: Vec<NamedRule>,
}

/// Marker-based family detection. Deliberately simple substring
/// heuristics: the bundles are safe to run on false positives, so the
/// detector errs toward matching.
pub fn detect(source: &str) -> Option<ObfuscationKind> {
    if source.contains("removeCookie") || source.contains("newState") {
        return Some(ObfuscationKind::ObfuscatorIo);
    }
    if source.contains(".push(") && source.contains(".shift()") {
        return Some(ObfuscationKind::AugmentedArray);
    }
    if source.contains("fromCharCode") && source.contains("charCodeAt") {
        return Some(ObfuscationKind::CaesarPlus);
    }
    if function_to_array::source_has_array_factory(source) {
        return Some(ObfuscationKind::FunctionToArray);
    }
    None
}

pub fn processor_for(kind: ObfuscationKind) -> Processor {
    match kind {
        ObfuscationKind::ObfuscatorIo => obfuscator_io::processor(),
        ObfuscationKind::AugmentedArray => augmented_array::processor(),
        ObfuscationKind::FunctionToArray => function_to_array::processor(),
        ObfuscationKind::CaesarPlus => caesar_plus::processor(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_obfuscator_io_markers() {
        assert_eq!(
            detect("var a = { 'removeCookie': function () { return 'dev'; } };"),
            Some(ObfuscationKind::ObfuscatorIo)
        );
    }

    #[test]
    fn detects_rotated_arrays() {
        assert_eq!(
            detect("(function (a, n) { while (n--) a.push(a.shift()); })(arr, 3);"),
            Some(ObfuscationKind::AugmentedArray)
        );
    }

    #[test]
    fn clean_code_detects_nothing() {
        assert_eq!(detect("function add(a, b) { return a + b; }"), None);
    }
}
