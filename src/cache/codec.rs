//! Hash field encoding for cached entities.
//!
//! Each entity is stored as a Redis hash rather than a serialized blob so
//! callers can fetch a subset of fields. Decoding is an explicit
//! field-by-field match: unknown fields are ignored (a newer writer may have
//! added some), and a value that fails coercion aborts the decode naming the
//! offending field.
//!
//! Optional fields use a zero-value-as-absent convention for compatibility
//! with existing data: the integer `0`, the nil UUID (or its canonical
//! string form), and the empty or literal `"null"` string all decode to
//! `None`. A legitimately-zero optional integer is therefore not
//! representable; callers that care must read the primary store.

use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::entities::{AuthorRecord, BookRecord, PageRecord};

use super::CacheError;

pub const FIELD_ID: &str = "id";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_SLUG: &str = "slug";
pub const FIELD_PAGE_COUNT: &str = "page_count";
pub const FIELD_PUBLICATION_YEAR: &str = "publication_year";
pub const FIELD_FILE: &str = "file";
pub const FIELD_SOURCE: &str = "source";
pub const FIELD_AUTHOR_ID: &str = "author_id";
pub const FIELD_NAME: &str = "name";
pub const FIELD_BODY: &str = "body";
pub const FIELD_PAGE_NUMBER: &str = "page_number";
pub const FIELD_BOOK_ID: &str = "book_id";

const NULL_LITERAL: &str = "null";

pub(crate) fn encode_book(book: &BookRecord) -> Vec<(&'static str, String)> {
    vec![
        (FIELD_ID, book.id.to_string()),
        (FIELD_TITLE, book.title.clone()),
        (FIELD_SLUG, book.slug.clone()),
        (FIELD_PAGE_COUNT, book.page_count.to_string()),
        (
            FIELD_PUBLICATION_YEAR,
            book.publication_year.unwrap_or(0).to_string(),
        ),
        (FIELD_FILE, book.file.clone().unwrap_or_default()),
        (FIELD_SOURCE, book.source.clone().unwrap_or_default()),
        (
            FIELD_AUTHOR_ID,
            book.author_id.unwrap_or_else(Uuid::nil).to_string(),
        ),
    ]
}

pub(crate) fn encode_author(author: &AuthorRecord) -> Vec<(&'static str, String)> {
    vec![
        (FIELD_ID, author.id.to_string()),
        (FIELD_NAME, author.name.clone()),
        (FIELD_SLUG, author.slug.clone()),
    ]
}

pub(crate) fn encode_page(page: &PageRecord) -> Vec<(&'static str, String)> {
    vec![
        (FIELD_ID, page.id.to_string()),
        (FIELD_BODY, page.body.clone()),
        (FIELD_PAGE_NUMBER, page.page_number.to_string()),
        (
            FIELD_BOOK_ID,
            page.book_id.unwrap_or_else(Uuid::nil).to_string(),
        ),
    ]
}

pub(crate) fn decode_book(fields: &HashMap<String, String>) -> Result<BookRecord, CacheError> {
    let mut book = BookRecord::default();
    for (field, value) in fields {
        match field.as_str() {
            FIELD_ID => book.id = parse_uuid(FIELD_ID, value)?,
            FIELD_TITLE => book.title = value.clone(),
            FIELD_SLUG => book.slug = value.clone(),
            FIELD_PAGE_COUNT => book.page_count = parse_int(FIELD_PAGE_COUNT, value)?,
            FIELD_PUBLICATION_YEAR => {
                book.publication_year = optional_int(parse_int(FIELD_PUBLICATION_YEAR, value)?);
            }
            FIELD_FILE => book.file = optional_string(value),
            FIELD_SOURCE => book.source = optional_string(value),
            FIELD_AUTHOR_ID => book.author_id = optional_uuid(FIELD_AUTHOR_ID, value)?,
            _ => {}
        }
    }
    Ok(book)
}

pub(crate) fn decode_author(fields: &HashMap<String, String>) -> Result<AuthorRecord, CacheError> {
    let mut author = AuthorRecord::default();
    for (field, value) in fields {
        match field.as_str() {
            FIELD_ID => author.id = parse_uuid(FIELD_ID, value)?,
            FIELD_NAME => author.name = value.clone(),
            FIELD_SLUG => author.slug = value.clone(),
            _ => {}
        }
    }
    Ok(author)
}

pub(crate) fn decode_page(fields: &HashMap<String, String>) -> Result<PageRecord, CacheError> {
    let mut page = PageRecord::default();
    for (field, value) in fields {
        match field.as_str() {
            FIELD_ID => page.id = parse_uuid(FIELD_ID, value)?,
            FIELD_BODY => page.body = value.clone(),
            FIELD_PAGE_NUMBER => page.page_number = parse_int(FIELD_PAGE_NUMBER, value)?,
            FIELD_BOOK_ID => page.book_id = optional_uuid(FIELD_BOOK_ID, value)?,
            _ => {}
        }
    }
    Ok(page)
}

fn parse_int(field: &'static str, value: &str) -> Result<i32, CacheError> {
    value.parse().map_err(|err| CacheError::Decode {
        field,
        message: format!("`{value}` is not an integer: {err}"),
    })
}

fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, CacheError> {
    Uuid::parse_str(value).map_err(|err| CacheError::Decode {
        field,
        message: format!("`{value}` is not a UUID: {err}"),
    })
}

fn optional_int(value: i32) -> Option<i32> {
    (value != 0).then_some(value)
}

fn optional_uuid(field: &'static str, value: &str) -> Result<Option<Uuid>, CacheError> {
    let id = parse_uuid(field, value)?;
    Ok((!id.is_nil()).then_some(id))
}

fn optional_string(value: &str) -> Option<String> {
    if value.is_empty() || value == NULL_LITERAL {
        None
    } else {
        Some(value.to_string())
    }
}
