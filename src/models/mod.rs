//! Domain models for the field updates server.

pub mod real_time_update;
pub mod reference;
pub mod ws_event;

pub use real_time_update::{
    FeedItem, MAX_RESIDENTS, NewRealTimeUpdate, PdfLinkResponse, Priority, RealTimeUpdate,
    SubmitUpdateResponse, UpdateFeedFilter, UpdateFeedResponse, UpdateType,
};
pub use reference::{
    CascadeOptions, CascadeSelection, CsrPartner, Project, ProjectQuery, Toll, TollQuery,
};
pub use ws_event::{WsEvent, WsEventMessage};
