//! Anti-automation interstitial detection.

/// Name of the defense whose interstitial `body` appears to be, if any.
///
/// Only whole-page walls count. A listing that merely embeds a captcha
/// widget in its contact form is not blocked.
#[must_use]
pub fn detect_block(body: &str) -> Option<&'static str> {
    let lowered = body.to_ascii_lowercase();

    let has_cloudflare_banner = lowered.contains("attention required! | cloudflare");
    let has_challenge_platform = lowered.contains("/cdn-cgi/challenge-platform/");
    let has_just_a_moment = lowered.contains("just a moment...");
    let has_cookie_gate = lowered.contains("please enable cookies");
    let has_cf_chl = lowered.contains("cf-chl-");
    if has_cloudflare_banner
        || has_challenge_platform
        || (has_just_a_moment && has_cookie_gate)
        || (has_just_a_moment && has_cf_chl)
    {
        return Some("cloudflare");
    }

    if lowered.contains("px-captcha")
        || (lowered.contains("press & hold") && lowered.contains("human"))
        || lowered.contains("_pxhd")
    {
        return Some("perimeterx");
    }

    let has_captcha = lowered.contains("captcha");
    let has_robot_prompt = lowered.contains("are you a robot")
        || lowered.contains("verify you are human")
        || lowered.contains("unusual traffic");
    if has_captcha && has_robot_prompt {
        return Some("captcha");
    }

    if lowered.contains("<title>access denied</title>")
        || lowered.contains("you don't have permission to access")
    {
        return Some("access_denied");
    }

    None
}
