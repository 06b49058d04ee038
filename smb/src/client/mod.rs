mod config;
mod connection;
mod credit;
mod lease;
mod open;
mod pipeline;
mod reconnect;
mod request;
mod session;
mod tree;

pub type SMBClientConfig = config::SMBClientConfig;
pub type SMBClientConfigBuilder = config::SMBClientConfigBuilder;
pub type SMBConnection<F> = connection::SMBConnection<F>;
pub type SMBCompoundBuilder<F> = connection::SMBCompoundBuilder<F>;
pub type SMBNegotiatedParams = connection::SMBNegotiatedParams;
pub type EffectiveSizes = credit::EffectiveSizes;
pub type SMBLeaseEvent = lease::SMBLeaseEvent;
pub type SMBLeaseLifecycle = lease::SMBLeaseLifecycle;
pub type SMBTreeConnect<F> = tree::SMBTreeConnect<F>;
pub type SMBOpen<F> = open::SMBOpen<F>;
pub type SMBOpenArgs = open::SMBOpenArgs;
pub type SMBOutstandingRequest = request::SMBOutstandingRequest;
pub type SMBRequestOutcome = request::SMBRequestOutcome;
pub type SMBRequestState = request::SMBRequestState;
