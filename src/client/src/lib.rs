pub mod channel;
pub mod entrypoint;
pub mod service {
    pub mod persistence;
    pub mod protocol;
    pub mod session;
}
pub mod transport;
