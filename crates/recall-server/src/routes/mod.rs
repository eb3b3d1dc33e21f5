pub mod ai;
pub mod flashcards;
pub mod notes;
