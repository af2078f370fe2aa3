pub mod domain;
pub mod heuristics;
pub mod parsing;
pub mod ports;
pub mod session;
pub mod sync;
pub mod training;
pub mod units;

pub use domain::{
    DataCollectionPreferences, Ingredient, ManualParsing, ManualParsingExample, ParseError,
    Preparation, RecipeIngredient, RecipeRef, RecipeStep, StepIngredientRef, StructuredIngredient,
    Token, TokenType, Unit,
};
pub use heuristics::{CookingHeuristics, TextHeuristics};
pub use ports::{Clock, KeyValueStore, PortError, PortResult};
pub use session::{
    reduce, Action, CompletionSummary, CookingSession, Direction, Rejection, SessionEvent,
    SessionState, SessionStatus, SessionView, Transition,
};
pub use training::TrainingExport;
