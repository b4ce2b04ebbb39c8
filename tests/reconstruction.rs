//! End-to-end reconstruction through the public API: a wrapped surface, a
//! host-page snapshot, and the draw sequence a host renderer would issue.

use canvas_scribe::{
    normalize_chapter, DrawSurface, Heuristics, NullSurface, SnapshotPage, SurfaceInterceptor,
};

const CHAPTER_PAGE: &str = r#"<div id="app">
    <div class="chapterTitle">第一章 起源</div>
    <div class="passage-content">
        <pre style="position: absolute; transform: translate(80, 700);">fn main() {
    println!();
}</pre>
        <img style="position: absolute; transform: translate(80, 1100);" src="https://host/fig1.jpg"/>
        <hr style="position: absolute; transform: translate(80, 1400);"/>
    </div>
</div>"#;

const CHAPTER_PAGE_WITH_LATE_IMAGE: &str = r#"<div id="app">
    <div class="chapterTitle">第一章 起源</div>
    <div class="passage-content">
        <pre style="position: absolute; transform: translate(80, 700);">fn main() {
    println!();
}</pre>
        <img style="position: absolute; transform: translate(80, 1100);" src="https://host/fig1.jpg"/>
        <hr style="position: absolute; transform: translate(80, 1400);"/>
        <img style="position: absolute; transform: translate(80, 1600);" src="https://host/late.jpg"/>
    </div>
</div>"#;

const BODY_COLOR: &str = "rgb(208, 211, 216)";

fn acquire(html: &str) -> SurfaceInterceptor<NullSurface, SnapshotPage> {
    SurfaceInterceptor::acquire(NullSurface::new(), SnapshotPage::new(html), Heuristics::default())
}

#[test]
fn reconstructs_a_full_chapter() {
    let mut surface = acquire(CHAPTER_PAGE);

    // Layout probe before any content; seeds the chapter title.
    surface.set_font("16px PingFang");
    surface.fill_text("abcdefghijklmnopqrstuvwxyz", 0.0, 0.0);

    // First paragraph: two full lines and a short closing line.
    surface.set_font("20px PingFang");
    surface.set_fill_style(BODY_COLOR);
    surface.fill_text("一段甲", 80.0, 100.0);
    surface.fill_text("一段乙", 800.0, 100.0);
    surface.fill_text("一段丙", 80.0, 140.0);
    surface.fill_text("一段丁", 800.0, 140.0);
    surface.fill_text("尾句", 80.0, 180.0);

    // Second paragraph, detected from the short previous line start.
    surface.fill_text("二段甲", 80.0, 220.0);
    surface.fill_text("二段乙", 800.0, 220.0);

    // Sub-heading; the host recolors heading text, which must not open a
    // highlight span.
    surface.set_font("24px PingFang");
    surface.set_fill_style("rgb(255, 255, 255)");
    surface.fill_text("小标题", 80.0, 320.0);

    // Body resumes; the code block anchored at y=700 sits between these
    // two baselines.
    surface.set_font("20px PingFang");
    surface.set_fill_style(BODY_COLOR);
    surface.fill_text("代码之前", 80.0, 600.0);
    surface.fill_text("代码之后", 80.0, 800.0);

    // Inline highlight run.
    surface.fill_text("普通", 80.0, 900.0);
    surface.set_fill_style("rgb(212, 120, 20)");
    surface.fill_text("强调", 400.0, 900.0);
    surface.set_fill_style(BODY_COLOR);
    surface.fill_text("继续", 700.0, 900.0);

    // The image anchored at y=1100 sits before this paragraph, which ends
    // in a superscript note.
    surface.fill_text("图后正文", 80.0, 1250.0);
    surface.set_font("14px PingFang");
    surface.fill_text("注1", 500.0, 1250.0);
    surface.set_font("20px PingFang");
    surface.fill_text("然后", 560.0, 1250.0);

    // End of render pass: the trailing rule at y=1400 is picked up.
    surface.restore();
    assert!(surface.session().is_complete());

    // The host mounts one more image after the pass; the deferred rescan
    // picks up only the new one.
    surface
        .session_mut()
        .host_mut()
        .set_html(CHAPTER_PAGE_WITH_LATE_IMAGE);
    surface.session_mut().run_pending_rescan();

    let expected = concat!(
        "## 第一章 起源\n\n",
        "\n\n一段甲一段乙",
        "\n一段丙一段丁",
        "\n尾句",
        "\n\n二段甲二段乙",
        "\n\n### 小标题",
        "\n\n代码之前",
        "\n\n```\nfn main() {\n    println!();\n}\n```",
        "\n\n代码之后",
        "\n\n普通`强调`继续",
        "\n\n![](https://host/fig1.jpg)\n",
        "\n\n图后正文<sup>注1</sup>然后",
        "\n\n------\n",
        "\n\n![](https://host/late.jpg)\n",
    );
    assert_eq!(surface.markdown(), expected);

    // Post-processing joins drawn lines back into paragraphs.
    let normalized = normalize_chapter(surface.markdown());
    let expected_normalized = concat!(
        "## 第一章 起源",
        "\n\n一段甲一段乙一段丙一段丁尾句",
        "\n\n二段甲二段乙",
        "\n\n### 小标题",
        "\n\n代码之前",
        "\n```\nfn main() {\n    println!();\n}\n```\n",
        "\n\n代码之后",
        "\n\n普通`强调`继续",
        "\n\n![](https://host/fig1.jpg)",
        "\n\n图后正文<sup>注1</sup>然后",
        "\n\n------",
        "\n\n![](https://host/late.jpg)\n",
    );
    assert_eq!(normalized, expected_normalized);
}

#[test]
fn title_sized_break_emits_heading() {
    let mut surface = acquire("");
    surface.set_font("30px PingFang");
    surface.fill_text("Hello", 10.0, 5.0);
    surface.fill_text("World", 10.0, 500.0);
    assert!(surface.markdown().ends_with("Hello\n\n## World"));
}

#[test]
fn clear_always_resets_regardless_of_prior_state() {
    let mut surface = acquire(CHAPTER_PAGE);
    surface.set_font("30px PingFang");
    surface.set_fill_style("rgb(255, 255, 255)");
    surface.fill_text("heading", 80.0, 120.0);
    surface.restore();
    surface.clear_rect(0.0, 0.0, 1600.0, 2000.0);

    let state = surface.session().engine().state();
    assert_eq!(state.markdown, "");
    assert_eq!(state.last_pos, (0.0, 0.0));
    assert!(!state.title_mode);
    assert!(!state.highlight_mode);
    assert!(!state.complete);
    assert_eq!(surface.session().engine().known_image_count(), 0);
    assert!(surface.session().pending_rescan().is_none());
}

#[test]
fn reset_between_passes_cancels_the_rescan() {
    let mut surface = acquire(CHAPTER_PAGE);
    surface.set_font("20px PingFang");
    surface.set_fill_style(BODY_COLOR);
    surface.fill_text("text", 800.0, 100.0);
    surface.restore();
    assert!(surface.session().pending_rescan().is_some());

    // Next chapter starts before the deferred rescan fires.
    surface.clear_rect(0.0, 0.0, 1600.0, 2000.0);
    surface
        .session_mut()
        .host_mut()
        .set_html(CHAPTER_PAGE_WITH_LATE_IMAGE);
    surface.session_mut().run_pending_rescan();
    assert_eq!(surface.markdown(), "");
}

#[test]
fn page_break_separates_paginated_passes() {
    let mut surface = acquire("");
    surface.set_font("20px PingFang");
    surface.set_fill_style(BODY_COLOR);
    surface.fill_text("页一", 800.0, 100.0);
    surface.restore();

    // The next page draws from the top again, so without the explicit break
    // its first line would run straight into the previous page's last line.
    surface.session_mut().append_page_break();
    surface.fill_text("页二", 800.0, 100.0);
    assert_eq!(surface.markdown(), "\n\n页一\n\n页二");
}

#[test]
fn image_only_chapter_falls_back_to_scanned_images() {
    let html = r#"<div class="passage-content">
        <img style="transform: translate(0, 300);" src="https://host/p1.jpg"/>
        <img style="transform: translate(0, 900);" src="https://host/p2.jpg"/>
    </div>"#;
    let mut surface = acquire(html);
    surface.restore();
    assert!(surface.session().is_complete());
    assert_eq!(surface.markdown(), "");

    surface.session_mut().fallback_images();
    assert_eq!(
        surface.markdown(),
        "![](https://host/p1.jpg)\n![](https://host/p2.jpg)\n"
    );
}

#[test]
fn reprime_after_clear_restores_element_lists() {
    let mut surface = acquire(CHAPTER_PAGE);
    assert_eq!(surface.session().engine().known_image_count(), 1);
    surface.clear_rect(0.0, 0.0, 1600.0, 2000.0);
    assert_eq!(surface.session().engine().known_image_count(), 0);
    surface.reprime();
    assert_eq!(surface.session().engine().known_image_count(), 1);
}

#[test]
fn tuned_profile_changes_classification() {
    let profile =
        Heuristics::from_json(r#"{"h2_min_px": 40.0, "h3_min_px": 35.0}"#).expect("profile");
    let mut surface =
        SurfaceInterceptor::acquire(NullSurface::new(), SnapshotPage::new(""), profile);
    surface.set_font("30px PingFang");
    surface.set_fill_style(BODY_COLOR);
    surface.fill_text("Hello", 800.0, 100.0);
    surface.fill_text("World", 800.0, 500.0);
    // 30px is body text under the tuned profile: paragraph breaks, no heading.
    assert_eq!(surface.markdown(), "\n\nHello\n\nWorld");
}
