//! Media-library search over already-uploaded assets.

use crate::models::Asset;

/// Case-insensitive substring match on public id, original filename and tags.
///
/// A blank query returns every asset. Input order is preserved.
pub fn search<'a>(assets: &'a [Asset], query: &str) -> Vec<&'a Asset> {
    if query.trim().is_empty() {
        return assets.iter().collect();
    }
    let needle = query.to_lowercase();

    assets
        .iter()
        .filter(|asset| {
            asset.public_id.to_lowercase().contains(&needle)
                || asset.original_filename.to_lowercase().contains(&needle)
                || asset
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase().contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn asset(public_id: &str, filename: &str, tags: &[&str]) -> Asset {
        Asset {
            public_id: public_id.to_string(),
            secure_url: format!("https://cdn.example.com/{}.webp", public_id),
            width: 100,
            height: 100,
            bytes: 1000,
            original_filename: filename.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    fn library() -> Vec<Asset> {
        vec![
            asset("blog/sunset-beach", "IMG_0001", &["travel"]),
            asset("blog/team-photo", "Team", &["About", "people"]),
            asset("store/mug", "mug_front", &["product"]),
        ]
    }

    #[test]
    fn test_blank_query_returns_all() {
        let assets = library();
        assert_eq!(search(&assets, "").len(), 3);
        assert_eq!(search(&assets, "   ").len(), 3);
    }

    #[test]
    fn test_query_is_not_trimmed() {
        let assets = vec![asset("store/mymug", "mymug", &[]), asset("store/my mug", "cup", &[])];
        let ids: Vec<_> = search(&assets, " mug").iter().map(|a| &a.public_id).collect();
        assert_eq!(ids, vec!["store/my mug"]);
    }

    #[test]
    fn test_matches_each_field_case_insensitively() {
        let assets = library();

        let by_id = search(&assets, "SUNSET");
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].public_id, "blog/sunset-beach");

        let by_name = search(&assets, "mug_f");
        assert_eq!(by_name[0].public_id, "store/mug");

        let by_tag = search(&assets, "about");
        assert_eq!(by_tag[0].public_id, "blog/team-photo");
    }

    #[test]
    fn test_preserves_order_and_handles_no_match() {
        let assets = library();
        let ids: Vec<_> = search(&assets, "blog").iter().map(|a| &a.public_id).collect();
        assert_eq!(ids, vec!["blog/sunset-beach", "blog/team-photo"]);
        assert!(search(&assets, "invoice").is_empty());
    }
}
