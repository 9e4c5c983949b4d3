pub mod document;
pub mod knowledge;
pub mod language;
pub mod normalize;
