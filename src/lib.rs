// data module
pub mod data {
    pub mod kinematics;
    pub mod event;
    pub mod quality;
    pub mod candidates;
    pub mod products;
}

// algorithm module
pub mod algorithm {
    pub mod selection;
    pub mod trigger;
    pub mod combinatorics;
    pub mod reconstruction;
}

// configuration and errors
pub mod config;
pub mod error;
