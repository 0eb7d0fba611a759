mod common;
mod fixture;
