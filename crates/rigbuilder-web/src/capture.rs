//! "Add to cart": capture the rendered view and store a cart snapshot
//!
//! The capture waits a short settle delay so the frame on screen reflects the
//! latest visibility, then reads the window back through Bevy's screenshot
//! support and encodes it as a PNG data URI in the browser. The cart view
//! decodes the stored URI again to show the preview.

use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::render::view::screenshot::{Screenshot, ScreenshotCaptured};
use rigbuilder_core::CartSnapshot;
use std::sync::{Arc, Mutex};

use crate::app::{ActiveView, Carts, Catalog, Selection};
use crate::notices::Notices;

pub struct CapturePlugin;

impl Plugin for CapturePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CaptureState>()
            .init_resource::<CartPreview>()
            .init_resource::<PendingPreview>()
            .add_systems(Update, (fire_capture, request_preview, poll_preview).chain());
    }
}

/// Progress of an "Add to cart" capture
#[derive(Resource, Debug, Clone, Copy, PartialEq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    /// Waiting for the scene to settle
    Scheduled { fire_at: f64 },
    /// Screenshot requested, waiting for the readback
    InFlight,
}

impl CaptureState {
    /// Schedule a capture unless one is already running
    pub fn schedule(&mut self, now: f64, settle_delay_ms: u64) -> bool {
        if *self != CaptureState::Idle {
            return false;
        }
        *self = CaptureState::Scheduled {
            fire_at: now + settle_delay_ms as f64 / 1000.0,
        };
        true
    }

    pub fn is_busy(&self) -> bool {
        *self != CaptureState::Idle
    }
}

fn fire_capture(mut commands: Commands, mut state: ResMut<CaptureState>, time: Res<Time>) {
    let CaptureState::Scheduled { fire_at } = *state else {
        return;
    };
    if time.elapsed_secs_f64() < fire_at {
        return;
    }
    tracing::info!("Capturing view for cart");
    commands
        .spawn(Screenshot::primary_window())
        .observe(on_screenshot_captured);
    *state = CaptureState::InFlight;
}

fn on_screenshot_captured(
    captured: On<ScreenshotCaptured>,
    mut state: ResMut<CaptureState>,
    catalog: Res<Catalog>,
    selection: Res<Selection>,
    mut carts: ResMut<Carts>,
    mut view: ResMut<ActiveView>,
    mut notices: ResMut<Notices>,
) {
    *state = CaptureState::Idle;

    let result = encode_data_url(&captured.image).and_then(|screenshot| {
        store_snapshot(screenshot, &selection, &catalog, &mut carts)
    });
    match result {
        Ok(()) => *view = ActiveView::Cart,
        Err(e) => {
            tracing::error!("Add to cart failed: {}", e);
            notices.error(format!("Could not add to cart: {}", e));
        }
    }
}

/// Build the snapshot and write it. Nothing is written when any step fails.
pub fn store_snapshot(
    screenshot: String,
    selection: &Selection,
    catalog: &Catalog,
    carts: &mut Carts,
) -> Result<(), String> {
    let snapshot = CartSnapshot::capture(screenshot, &selection.0, &catalog.config)
        .map_err(|e| e.to_string())?;
    carts.repo.store(&snapshot).map_err(|e| e.to_string())?;
    carts.current = Some(snapshot);
    Ok(())
}

/// Tightly packed RGBA8 pixels of a captured frame
pub fn rgba_pixels(image: &Image) -> Result<Vec<u8>, String> {
    let data = image
        .data
        .as_ref()
        .ok_or_else(|| "screenshot has no pixel data".to_string())?;
    match image.texture_descriptor.format {
        TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => Ok(data.clone()),
        TextureFormat::Bgra8Unorm | TextureFormat::Bgra8UnormSrgb => {
            let mut pixels = data.clone();
            for pixel in pixels.chunks_exact_mut(4) {
                pixel.swap(0, 2);
            }
            Ok(pixels)
        }
        other => Err(format!("unsupported screenshot format {:?}", other)),
    }
}

fn encode_data_url(image: &Image) -> Result<String, String> {
    let pixels = rgba_pixels(image)?;
    js_interop::encode_png_data_url(&pixels, image.width(), image.height())
}

// ============================================================================
// Cart preview
// ============================================================================

/// Texture for the screenshot of the stored cart
#[derive(Resource, Default)]
pub struct CartPreview {
    /// Screenshot URI the texture was decoded from
    pub source: Option<String>,
    pub image: Option<Handle<Image>>,
    pub size: UVec2,
}

/// A decoded screenshot
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decoded images from JavaScript callbacks. Only the newest one is kept.
#[derive(Resource, Default)]
pub struct PendingPreview(pub Arc<Mutex<Option<Result<DecodedImage, String>>>>);

/// Start decoding when the stored cart's screenshot differs from the preview
fn request_preview(
    view: Res<ActiveView>,
    carts: Res<Carts>,
    mut preview: ResMut<CartPreview>,
    pending: Res<PendingPreview>,
) {
    if *view != ActiveView::Cart {
        return;
    }
    let wanted = carts.current.as_ref().map(|snapshot| &snapshot.screenshot);
    if wanted == preview.source.as_ref() {
        return;
    }

    preview.image = None;
    preview.source = wanted.cloned();
    if let Some(source) = wanted {
        js_interop::decode_data_url(source.clone(), pending.0.clone());
    }
}

fn poll_preview(
    pending: Res<PendingPreview>,
    mut preview: ResMut<CartPreview>,
    mut images: ResMut<Assets<Image>>,
) {
    let Some(result) = pending.0.lock().ok().and_then(|mut slot| slot.take()) else {
        return;
    };
    match result {
        // Ignore decodes for a cart that has since been replaced
        Ok(decoded) if preview.source.as_deref() == Some(decoded.source.as_str()) => {
            let image = Image::new(
                Extent3d {
                    width: decoded.width,
                    height: decoded.height,
                    depth_or_array_layers: 1,
                },
                TextureDimension::D2,
                decoded.rgba,
                TextureFormat::Rgba8UnormSrgb,
                RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
            );
            preview.size = UVec2::new(decoded.width, decoded.height);
            preview.image = Some(images.add(image));
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Cart preview unavailable: {}", e),
    }
}

// ============================================================================
// JavaScript Interop (WASM only)
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod js_interop {
    use super::*;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::{Clamped, JsCast};
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, ImageData};

    fn js_error(context: &str, e: JsValue) -> String {
        format!("{}: {:?}", context, e)
    }

    /// Offscreen canvas with its 2D context
    fn scratch_canvas(
        width: u32,
        height: u32,
    ) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d), String> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| "no document object".to_string())?;
        let canvas = document
            .create_element("canvas")
            .map_err(|e| js_error("canvas not available", e))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| "failed to cast to HtmlCanvasElement".to_string())?;
        canvas.set_width(width);
        canvas.set_height(height);
        let context = canvas
            .get_context("2d")
            .map_err(|e| js_error("2d context failed", e))?
            .ok_or_else(|| "2d context not available".to_string())?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| "failed to cast to CanvasRenderingContext2d".to_string())?;
        Ok((canvas, context))
    }

    pub fn encode_png_data_url(rgba: &[u8], width: u32, height: u32) -> Result<String, String> {
        let (canvas, context) = scratch_canvas(width, height)?;
        let image_data = ImageData::new_with_u8_clamped_array_and_sh(Clamped(rgba), width, height)
            .map_err(|e| js_error("ImageData failed", e))?;
        context
            .put_image_data(&image_data, 0.0, 0.0)
            .map_err(|e| js_error("putImageData failed", e))?;
        canvas
            .to_data_url_with_type("image/png")
            .map_err(|e| js_error("toDataURL failed", e))
    }

    /// Decode a data URI through an `<img>` element and read the pixels back
    pub fn decode_data_url(
        source: String,
        pending: Arc<Mutex<Option<Result<DecodedImage, String>>>>,
    ) {
        let image = match HtmlImageElement::new() {
            Ok(image) => image,
            Err(e) => {
                tracing::error!("decode_data_url: failed to create image: {:?}", e);
                return;
            }
        };

        let image_clone = image.clone();
        let pending_clone = pending.clone();
        let source_clone = source.clone();
        let onload = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let width = image_clone.natural_width();
            let height = image_clone.natural_height();
            let result = scratch_canvas(width, height).and_then(|(_, context)| {
                context
                    .draw_image_with_html_image_element(&image_clone, 0.0, 0.0)
                    .map_err(|e| js_error("drawImage failed", e))?;
                let data = context
                    .get_image_data(0.0, 0.0, width as f64, height as f64)
                    .map_err(|e| js_error("getImageData failed", e))?;
                Ok(DecodedImage {
                    source: source_clone.clone(),
                    width,
                    height,
                    rgba: data.data().0,
                })
            });
            if let Ok(mut slot) = pending_clone.lock() {
                *slot = Some(result);
            }
        }) as Box<dyn FnMut(_)>);

        let onerror = Closure::wrap(Box::new(move |_: web_sys::Event| {
            if let Ok(mut slot) = pending.lock() {
                *slot = Some(Err("screenshot could not be decoded".to_string()));
            }
        }) as Box<dyn FnMut(_)>);

        image.set_onload(Some(onload.as_ref().unchecked_ref()));
        image.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onload.forget();
        onerror.forget();

        image.set_src(&source);
    }
}

// Non-WASM stubs
#[cfg(not(target_arch = "wasm32"))]
mod js_interop {
    use super::*;

    pub fn encode_png_data_url(_rgba: &[u8], _width: u32, _height: u32) -> Result<String, String> {
        Err("screenshot encoding is only supported in the browser".to_string())
    }

    pub fn decode_data_url(
        _source: String,
        pending: Arc<Mutex<Option<Result<DecodedImage, String>>>>,
    ) {
        if let Ok(mut slot) = pending.lock() {
            *slot = Some(Err("preview decoding is only supported in the browser".to_string()));
        }
    }
}
