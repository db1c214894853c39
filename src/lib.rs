//! Out Loud: capture a photo, find its text, read it aloud.
//!
//! The crate is organised around a single state machine
//! ([`pipeline::StateController`]) that sequences four collaborators:
//!
//! | Module      | Role                                              |
//! |-------------|---------------------------------------------------|
//! | [`capture`] | Live view + still photo capture                   |
//! | [`detect`]  | Splits a photo into text regions                  |
//! | [`ocr`]     | Recognizes the text of one region                 |
//! | [`speech`]  | Speech engine + the ordered [`speech::Announcer`] |
//!
//! Taps arrive from [`input`]; settings come from [`config`].

pub mod capture;
pub mod config;
pub mod detect;
pub mod input;
pub mod ocr;
pub mod pipeline;
pub mod speech;
