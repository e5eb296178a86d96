mod tag;

pub use tag::Tags;
