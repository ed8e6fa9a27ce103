pub mod ai;
pub mod movement;
pub mod population;
pub mod super_fruit;
