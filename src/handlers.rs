pub mod commission;
