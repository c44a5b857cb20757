pub mod event_pump;
