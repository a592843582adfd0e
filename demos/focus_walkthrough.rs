use dom_a11y::{ChromeHost, Config, DomContext, HostTrait, Politeness};

const PAGE: &str = r##"<!doctype html>
<html>
<head><title>Checkout</title></head>
<body>
  <nav><a href="#main">Skip to content</a></nav>
  <div style="height: 2000px"></div>
  <main id="main">
    <h1>Shipping details</h1>
    <form id="shipping">
      <fieldset class="field">
        <label for="name">Name</label>
        <input id="name" value="Ada">
      </fieldset>
      <fieldset class="field">
        <label for="postcode">Postcode</label>
        <input id="postcode" aria-invalid="true">
      </fieldset>
    </form>
  </main>
</body>
</html>"##;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("🚀 Launching headless Chrome...");
    let config = Config::default();
    let host = ChromeHost::launch(&config.host).await?;
    host.set_content(PAGE).await?;
    let ctx = DomContext::new(host, config);

    println!("📍 Following the skip link hash...");
    let outcome = ctx.reset_focus_for_location("body", "#main").await;
    println!("   focus: {:?}, scroll: {:?}", outcome.focus, outcome.scroll);

    println!("📝 Jumping to the first invalid field...");
    let outcome = ctx
        .focus_invalid_form("#shipping", "[aria-invalid=true]", ".field")
        .await;
    println!("   {:?}", outcome);
    if let Some(active) = ctx.host().active_element().await? {
        let info = ctx.host().element_info(&active).await?;
        println!("   focused <{}> #{:?}", info.tag_name, info.element_id);
    }

    ctx.set_title("Fix 1 error - Checkout").await;
    println!("🏷️  Title is now {:?}", ctx.host().title().await?);

    let outcome = ctx
        .announce_with("Postcode is required", Politeness::Assertive)
        .await;
    println!("📣 Announcement: {:?}", outcome);
    println!(
        "🎞️  Prefers reduced motion: {}",
        ctx.prefers_reduced_motion().await
    );

    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
    println!("✅ Walkthrough completed!");
    Ok(())
}
