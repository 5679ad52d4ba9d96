mod channel_state;

pub use channel_state::{ChannelField, ChannelState, INITIAL_IMAGE_INDEX};
