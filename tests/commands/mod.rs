//! Command-level test modules

mod test_archive;
mod test_init_session;
