pub mod cognac_best;

pub mod compare;
pub mod results;
pub mod variant;
