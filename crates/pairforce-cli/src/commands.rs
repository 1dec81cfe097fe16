pub mod check;
pub mod evaluate;
