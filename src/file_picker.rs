// Cross-platform file open/save helpers.
// Native desktop uses rfd dialogs synchronously. On wasm we create a hidden
// <input type=file>, read the bytes asynchronously and hand them over through
// `take_picked`; saving triggers a download link.

#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

/// What the user is picking a file for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickPurpose {
    MapImage,
    PinImport,
    Config,
}

impl PickPurpose {
    #[cfg(not(target_arch = "wasm32"))]
    fn filter(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::MapImage => ("Image", &["png", "jpg", "jpeg"]),
            Self::PinImport | Self::Config => ("JSON", &["json"]),
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn accept(self) -> &'static str {
        match self {
            Self::MapImage => "image/png,image/jpeg",
            Self::PinImport | Self::Config => "application/json,.json",
        }
    }
}

pub struct PickedFile {
    pub purpose: PickPurpose,
    pub name: String,
    pub bytes: Vec<u8>,
    /// Where the file came from, when the platform has paths.
    #[cfg(not(target_arch = "wasm32"))]
    pub path: Option<PathBuf>,
}

#[cfg(target_arch = "wasm32")]
mod web {
    use js_sys::Uint8Array;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::JsValue;
    use wasm_bindgen::closure::Closure;
    use web_sys::{FileReader, HtmlElement, HtmlInputElement};

    use super::{PickPurpose, PickedFile};

    static PICKED: Lazy<Mutex<Option<PickedFile>>> = Lazy::new(|| Mutex::new(None));

    pub fn open_picker(purpose: PickPurpose) {
        log::debug!("file_picker: opening picker for {purpose:?}");
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(input) = document
            .create_element("input")
            .ok()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        else {
            return;
        };

        input.set_type("file");
        input.set_accept(purpose.accept());
        // Off-screen rather than display:none; some browsers block clicks on hidden inputs.
        let _ = input.set_attribute(
            "style",
            "position: fixed; left: -9999px; width: 1px; height: 1px; opacity: 0;",
        );
        if let Some(body) = document.body() {
            let _ = body.append_child(&input);
        }

        let onchange = Closure::wrap(Box::new(move |ev: web_sys::Event| {
            let Some(input) = ev
                .target()
                .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
            else {
                return;
            };
            let Some(file) = input.files().and_then(|files| files.get(0)) else {
                return;
            };
            let Ok(reader) = FileReader::new() else {
                return;
            };
            let reader2 = reader.clone();
            let name = file.name();
            let onload = Closure::once(Box::new(move |_e: JsValue| {
                let Ok(result) = reader2.result() else {
                    return;
                };
                let bytes = Uint8Array::new(&result).to_vec();
                if let Ok(mut slot) = PICKED.lock() {
                    *slot = Some(PickedFile {
                        purpose,
                        name,
                        bytes,
                    });
                }
            }) as Box<dyn FnOnce(_)>);
            reader.set_onload(Some(onload.as_ref().unchecked_ref()));
            onload.forget();
            let _ = reader.read_as_array_buffer(&file);
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(onchange.as_ref().unchecked_ref()));
        onchange.forget(); // keep alive

        input.click();
    }

    pub fn take_picked() -> Option<PickedFile> {
        PICKED.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn download(name: &str, mime: &str, bytes: &[u8]) -> Result<(), String> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| "no document to download into".to_owned())?;
        let text = String::from_utf8_lossy(bytes);
        let encoded = String::from(js_sys::encode_uri_component(&text));
        let href = format!("data:{mime};charset=utf-8,{encoded}");
        let anchor = document
            .create_element("a")
            .map_err(|_| "cannot create download link".to_owned())?;
        anchor
            .set_attribute("href", &href)
            .and_then(|()| anchor.set_attribute("download", name))
            .map_err(|_| "cannot prepare download link".to_owned())?;
        let anchor = anchor
            .dyn_into::<HtmlElement>()
            .map_err(|_| "download link is not clickable".to_owned())?;
        anchor.click();
        Ok(())
    }
}

/// Asks the user for a file.
///
/// On native this blocks on the dialog and returns the file directly. On the
/// web it opens the browser picker and returns `None`; the file shows up in
/// [`take_picked`] on a later frame.
#[cfg(all(not(target_arch = "wasm32"), not(target_os = "android")))]
pub fn pick(purpose: PickPurpose) -> Result<Option<PickedFile>, String> {
    let (filter, extensions) = purpose.filter();
    let Some(path) = rfd::FileDialog::new()
        .add_filter(filter, extensions)
        .pick_file()
    else {
        return Ok(None);
    };
    let bytes = std::fs::read(&path).map_err(|e| format!("{}: {e}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Some(PickedFile {
        purpose,
        name,
        bytes,
        path: Some(path),
    }))
}

#[cfg(target_arch = "wasm32")]
pub fn pick(purpose: PickPurpose) -> Result<Option<PickedFile>, String> {
    web::open_picker(purpose);
    Ok(None)
}

#[cfg(target_os = "android")]
pub fn pick(purpose: PickPurpose) -> Result<Option<PickedFile>, String> {
    Err(format!("no file dialog available for {}", purpose.filter().0))
}

#[cfg(target_arch = "wasm32")]
pub use web::take_picked;

#[cfg(not(target_arch = "wasm32"))]
// Native dialogs return their file from `pick` directly.
pub fn take_picked() -> Option<PickedFile> {
    None
}

/// Offers `bytes` to the user as a file called `name`.
/// Returns `Ok(false)` if the user cancelled.
#[cfg(all(not(target_arch = "wasm32"), not(target_os = "android")))]
pub fn save(name: &str, _mime: &str, bytes: &[u8]) -> Result<bool, String> {
    let extension = name.rsplit('.').next().unwrap_or_default();
    let Some(path) = rfd::FileDialog::new()
        .set_file_name(name)
        .add_filter(extension, &[extension])
        .save_file()
    else {
        return Ok(false);
    };
    std::fs::write(&path, bytes).map_err(|e| format!("{}: {e}", path.display()))?;
    log::info!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(true)
}

#[cfg(target_arch = "wasm32")]
pub fn save(name: &str, mime: &str, bytes: &[u8]) -> Result<bool, String> {
    web::download(name, mime, bytes).map(|()| true)
}

#[cfg(target_os = "android")]
pub fn save(name: &str, _mime: &str, _bytes: &[u8]) -> Result<bool, String> {
    Err(format!("saving {name} is not supported on this platform"))
}
