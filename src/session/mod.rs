//! Session control: what happens after a number is dialed

mod cancel;
mod controller;
mod modes;
mod phrases;
mod state;

#[cfg(test)]
mod testing;

pub use controller::Controller;
pub use state::Language;
