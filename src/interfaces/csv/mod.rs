pub mod donation_reader;
pub mod outcome_writer;
