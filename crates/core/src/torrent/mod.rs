//! Transfer descriptors: storage, download, inspection and per-subscriber
//! personalization.

mod fetcher;
mod inspect;
mod personalizer;
mod store;

pub use fetcher::{DescriptorFetcher, FetchError, HttpDescriptorFetcher};
pub use inspect::{inspect_descriptor, DescriptorInfo, InspectError};
pub use personalizer::{
    CanonicalDescriptor, PersonalizeError, PersonalizedDescriptor, TorrentPersonalizer,
    TOKEN_PLACEHOLDER,
};
pub use store::{DescriptorStore, FsDescriptorStore};
