//! The uniform packet contract
//!
//! Every protocol variant implements [`Packet`]. A packet carries its own
//! header fields plus an owned, optional child packet (its payload), which
//! makes a decoded frame a head-to-tail chain of boxed layers. Chains are
//! acyclic by construction and freed with the head.

use std::any::Any;
use std::fmt;

use crate::buffer::Buffer;
use crate::error::Result;
use crate::kind::Kind;

/// A protocol layer that can serialize itself and link a payload below it
pub trait Packet: fmt::Debug {
    /// The protocol variant this packet encodes
    fn kind(&self) -> Kind;

    /// Size of this layer's header alone, in bytes
    fn header_len(&self) -> u16;

    /// Size of this layer plus its whole payload chain, in bytes
    fn total_len(&self) -> u16 {
        self.header_len() + self.payload().map_or(0, |p| p.total_len())
    }

    /// Serialize the header at the buffer cursor and recurse into the payload.
    ///
    /// Length and next-protocol fields are derived from the payload when one
    /// is linked; checksum fields are finalized and back-patched once the
    /// covered bytes are in the buffer. The serialized size of a chain equals
    /// [`total_len`](Packet::total_len) exactly.
    fn pack(&mut self, buf: &mut Buffer) -> Result<()>;

    /// Populate the header fields from the buffer cursor.
    ///
    /// Does not touch the payload link; chain reassembly belongs to the
    /// composer.
    fn unpack(&mut self, buf: &mut Buffer) -> Result<()>;

    /// Decide the payload kind from this header's fields
    fn guess_payload_kind(&self) -> Kind {
        Kind::None
    }

    /// The linked payload, if any
    fn payload(&self) -> Option<&dyn Packet>;

    /// Link a child packet below this layer.
    ///
    /// Rejects incompatible kinds with `Error::UnsupportedLayer`. IP layers
    /// additionally seed the child's checksum state with their pseudo-header
    /// sum here, so a transport packed right after linking carries a final
    /// checksum.
    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()>;

    /// Receive a pseudo-header seed from the enclosing IP layer.
    ///
    /// Only checksum-bearing transports care; the default ignores it.
    fn init_checksum(&mut self, _seed: u32) {}

    /// Structural field-by-field equality, payload links excluded
    fn equals(&self, other: &dyn Packet) -> bool;

    /// Whether this packet is a plausible reply to `other`
    fn answers(&self, _other: &dyn Packet) -> bool {
        false
    }

    /// Downcast support for callers that need the concrete type
    fn as_any(&self) -> &dyn Any;
}
