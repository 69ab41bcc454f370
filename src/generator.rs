use rand_core::RngCore;

use crate::{
    catalog::MessageId,
    frame::RawFrame,
    message::{DecodeError, DecodedMessage},
};

/// Produces random payloads and frames for exercising decoders.
///
/// The generator owns whatever RNG the caller hands it, so seeding and
/// reproducibility are the caller's choice.
#[derive(Debug, Clone)]
pub struct FrameGenerator<R> {
    rng: R,
}

impl<R: RngCore> FrameGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }

    pub fn next_payload(&mut self) -> [u8; 8] {
        let mut payload = [0u8; 8];
        self.rng.fill_bytes(&mut payload);

        payload
    }

    /// A random frame for `id`, sized to the message's catalog length
    pub fn next_frame(&mut self, id: MessageId) -> RawFrame {
        let payload = self.next_payload();
        let length = id.definition().length;

        // Catalog identifiers are 11-bit and catalog lengths are at most 8
        match RawFrame::for_message(id, &payload[..length]) {
            Some(frame) => frame,
            None => unreachable!("catalog entry {:?} does not fit a classic frame", id),
        }
    }
}

/// Decodes one payload as every message in the catalog, trimming it to each
/// message's length.
pub fn decode_as_each_message(
    payload: &[u8; 8],
) -> impl Iterator<Item = (MessageId, Result<DecodedMessage, DecodeError>)> + '_ {
    MessageId::ALL.into_iter().map(move |id| {
        let length = id.definition().length;

        (id, DecodedMessage::decode(id.raw(), &payload[..length]))
    })
}
