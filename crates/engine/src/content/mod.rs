mod roster;

pub use roster::{
    compile_placement_roster, parse_placement_roster, ContentError, ContentErrorCode,
    PlacementDef, SourceLocation,
};
