#![allow(dead_code)]

pub mod command;
pub mod sandbox;

pub const AUTHOR_NAME: &str = "Ada Lovelace";
pub const AUTHOR_EMAIL: &str = "ada@example.com";
