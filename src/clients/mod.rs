//! Outbound calls to sibling services.

mod profile_lookup;

pub use profile_lookup::ProfileLookupClient;
