//! Embeddable markup for stored images

use maud::html;

use super::StoredMedia;

/// `<img>` tag for inserting a stored image into post content
pub fn image_markup(media: &StoredMedia) -> String {
    let class = format!("immich-image immich-image-{}", media.local_id);
    html! {
        img src=(media.url) alt=(media.filename) class=(class);
    }
    .into_string()
}
