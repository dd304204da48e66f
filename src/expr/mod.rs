pub mod csc;
pub mod normalize;
pub mod scale;
pub mod variable;
