use crate::commons::basic_functions::escape_html;
use crate::config::{ClassPalette, Decorations};
use crate::geometric::classify::NtlClass;

/// Fixed title banner centred at the top of the page
pub fn title_html(title: &str) -> String {
    format!(
        r#"<h3 align="center" style="font-size:20px; color:white;
    position:fixed; top:10px; left:50%; transform:translateX(-50%);
    z-index:9999; background-color:rgba(0,0,0,0.6); padding:10px;
    border-radius:10px; font-family: sans-serif;">
    {}
</h3>"#,
        escape_html(title)
    )
}

/// Colour key in the bottom-left corner, brightest class first
pub fn legend_html(legend_title: &str, palette: &ClassPalette) -> String {
    let mut entries = String::new();
    for (i, class) in NtlClass::ALL.iter().rev().enumerate() {
        if i > 0 {
            entries.push_str("<br>\n");
        }
        entries.push_str(&format!(
            r#"    <i style="background:{}; width:12px; height:12px; display:inline-block; border:1px solid #000;"></i> {}"#,
            escape_html(palette.color_for(Some(*class))),
            class.label()
        ));
    }
    format!(
        r#"<div style="position: fixed;
    bottom: 30px; left: 30px; width: 160px; height: auto;
    background-color: rgba(255, 255, 255, 0.9); border:2px solid grey;
    z-index:9999; font-size:14px; padding: 10px; border-radius: 8px;
    font-family: sans-serif; line-height: 1.6;">
    <b>{}</b><br>
{}
</div>"#,
        escape_html(legend_title),
        entries
    )
}

/// All decoration fragments, in page order
pub fn decorations_html(decorations: &Decorations, palette: &ClassPalette) -> String {
    let mut html = title_html(&decorations.title);
    if decorations.show_legend {
        html.push('\n');
        html.push_str(&legend_html(&decorations.legend_title, palette));
    }
    html
}
