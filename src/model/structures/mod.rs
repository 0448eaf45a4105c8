pub mod archetype;
pub mod match_result;
pub mod outcome;
pub mod player_record;
pub mod rating_update;
