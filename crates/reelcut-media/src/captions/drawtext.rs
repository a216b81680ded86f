//! FFmpeg `drawtext` overlays for laid-out captions.
//!
//! Caption text is read from a file per caption (`textfile=`) so arbitrary
//! user text never has to survive filtergraph escaping.

use std::path::Path;

use reelcut_models::{Caption, CaptionPosition};

/// Quote a value for use inside a filtergraph option.
pub fn quote_filter_value(value: &str) -> String {
    format!("'{}'", value.replace('\\', "/").replace('\'', "'\\''"))
}

/// Vertical placement expression for a caption.
fn y_expression(position: CaptionPosition, margin_px: u32) -> String {
    match position {
        CaptionPosition::TopCenter => format!("{margin_px}"),
        CaptionPosition::Center => "(h-text_h)/2".to_string(),
        CaptionPosition::BottomCenter => format!("h-text_h-{margin_px}"),
    }
}

/// Build one `drawtext` filter for `caption` on a frame `output_height` pixels tall.
pub fn drawtext_filter(caption: &Caption, text_file: &Path, output_height: u32) -> String {
    let style = &caption.style;
    let margin_px = (style.margin.clamp(0.0, 0.5) * output_height as f64).round() as u32;

    let mut filter = format!(
        "drawtext=textfile={file}:font={font}:fontsize={size}:fontcolor={color}:\
         borderw={stroke_w}:bordercolor={stroke}:x=(w-text_w)/2:y={y}:\
         enable='between(t,{start:.3},{end:.3})'",
        file = quote_filter_value(&text_file.to_string_lossy()),
        font = quote_filter_value(&style.font),
        size = style.font_size,
        color = quote_filter_value(&style.color),
        stroke_w = style.stroke_width,
        stroke = quote_filter_value(&style.stroke_color),
        y = y_expression(style.position, margin_px),
        start = caption.start,
        end = caption.end,
    );

    if style.animate && style.fade_in > 0.0 {
        let fade = style.fade_in.min(caption.duration());
        filter.push_str(&format!(
            ":alpha='if(lt(t,{start:.3}),0,if(lt(t,{full:.3}),(t-{start:.3})/{fade:.3},1))'",
            start = caption.start,
            full = caption.start + fade,
            fade = fade,
        ));
    }

    filter
}

/// Chain of `drawtext` filters, one per caption, in overlay order.
///
/// `text_files[i]` holds the text of `captions[i]`. Returns `None` when
/// there is nothing to draw.
pub fn caption_filter_chain<P: AsRef<Path>>(
    captions: &[Caption],
    text_files: &[P],
    output_height: u32,
) -> Option<String> {
    if captions.is_empty() {
        return None;
    }
    Some(
        captions
            .iter()
            .zip(text_files)
            .map(|(caption, file)| drawtext_filter(caption, file.as_ref(), output_height))
            .collect::<Vec<_>>()
            .join(","),
    )
}
