use super::*;

struct Failing;

impl BannerImageProvider for Failing {
    fn render(&self, _: &str, _: u32, _: u32) -> StoryreelResult<image::RgbaImage> {
        Err(StoryreelError::asset("renderer offline"))
    }
}

struct Fixed(u32, u32);

impl BannerImageProvider for Fixed {
    fn render(&self, _: &str, _: u32, _: u32) -> StoryreelResult<image::RgbaImage> {
        Ok(image::RgbaImage::from_pixel(self.0, self.1, image::Rgba([9, 9, 9, 255])))
    }
}

#[test]
fn dimensions_follow_canvas_and_fraction() {
    let canvas = Canvas::default();
    assert_eq!(banner_dimensions(canvas, 400.0 / 1920.0).unwrap(), (1080, 400));
    let small = Canvas {
        width: 720,
        height: 1280,
    };
    assert_eq!(banner_dimensions(small, 0.25).unwrap(), (720, 320));
    let empty = Canvas {
        width: 0,
        height: 1920,
    };
    assert!(banner_dimensions(empty, 0.2).is_err());
    assert!(banner_dimensions(canvas, 0.0).is_err());
    assert!(banner_dimensions(canvas, 1.5).is_err());
}

#[test]
fn placeholder_has_card_and_stripe() {
    let img = placeholder_banner(1080, 400);
    assert_eq!(img.dimensions(), (1080, 400));
    assert_eq!(img.get_pixel(0, 0).0, ACCENT_RGBA);
    assert_eq!(img.get_pixel(500, 200).0, CARD_RGBA);
}

#[test]
fn failures_fall_back_to_placeholder() {
    let img = banner_or_placeholder(Some(&Failing), "Title", 200, 80);
    assert_eq!(img, placeholder_banner(200, 80));
    let img = banner_or_placeholder(None, "Title", 200, 80);
    assert_eq!(img, placeholder_banner(200, 80));
}

#[test]
fn provider_output_is_resized_to_target() {
    let img = banner_or_placeholder(Some(&Fixed(100, 40)), "Title", 200, 80);
    assert_eq!(img.dimensions(), (200, 80));
    let img = banner_or_placeholder(Some(&Fixed(200, 80)), "Title", 200, 80);
    assert_eq!(img.get_pixel(10, 10).0, [9, 9, 9, 255]);
}

#[test]
fn file_banner_round_trips_through_png() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("banner.png");
    save_png(&placeholder_banner(64, 24), &path).unwrap();

    let provider = FileBanner { path: path.clone() };
    let img = provider.render("ignored", 64, 24).unwrap();
    assert_eq!(img, placeholder_banner(64, 24));

    let missing = FileBanner {
        path: dir.path().join("nope.png"),
    };
    let fallback = banner_or_placeholder(Some(&missing), "t", 64, 24);
    assert_eq!(fallback, placeholder_banner(64, 24));
}
