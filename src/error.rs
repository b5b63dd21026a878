//! Error taxonomy (spec §7). Nothing here is retried in firmware — the USB
//! host layer retries SETUP packets at the protocol level.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbError {
    /// Report submission was attempted before enumeration completed.
    NotAttached,
    /// GET_DESCRIPTOR asked for a `wValue` this firmware doesn't emit.
    UnsupportedDescriptor,
    /// A standard or class request this firmware doesn't implement.
    UnsupportedRequest,
    /// RX-OUT was observed mid-IN: the host ended the data stage early.
    HostAbortedDataStage,
    /// The post-End-Of-Reset endpoint configuration did not take.
    EndpointConfigFailure,
}
