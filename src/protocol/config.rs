//! WebSocket frame/message limits.

/// Per-connection limits applied while decoding frames and reassembling messages.
///
/// # Example
/// ```
/// # use sockeon::protocol::FrameLimits;
/// let limits = FrameLimits::default()
///     .max_frame_size(1024 * 1024)
///     .max_continuation_frames(64);
/// ```
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct FrameLimits {
    /// Maximum size of a single frame's payload, not including the header.
    pub max_frame_size: usize,
    /// Maximum size of a fully reassembled message (sum of continuation payloads).
    pub max_message_size: usize,
    /// Maximum number of continuation frames accepted for one fragmented message.
    pub max_continuation_frames: usize,
    /// Whether unmasked client frames are accepted. RFC 6455 requires rejecting
    /// them; kept configurable only for interoperability with misbehaving clients.
    pub accept_unmasked_frames: bool,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_frame_size: crate::MAX_ALLOWED_LEN,
            max_message_size: crate::MAX_ALLOWED_LEN,
            max_continuation_frames: crate::MAX_CONTINUATION_FRAMES,
            accept_unmasked_frames: false,
        }
    }
}

impl FrameLimits {
    /// Set [`Self::max_frame_size`].
    pub fn max_frame_size(mut self, size: usize) -> Self {
        assert!(size > 0);
        self.max_frame_size = size;
        self
    }

    /// Set [`Self::max_message_size`].
    pub fn max_message_size(mut self, size: usize) -> Self {
        assert!(size > 0);
        self.max_message_size = size;
        self
    }

    /// Set [`Self::max_continuation_frames`].
    pub fn max_continuation_frames(mut self, count: usize) -> Self {
        assert!(count > 0);
        self.max_continuation_frames = count;
        self
    }

    /// Set [`Self::accept_unmasked_frames`].
    pub fn accept_unmasked_frames(mut self, accept: bool) -> Self {
        self.accept_unmasked_frames = accept;
        self
    }
}
