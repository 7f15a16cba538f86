use serde::{Deserialize, Serialize};

/// A recipe as submitted by an operator, before the store assigns it an id and timestamps.
#[derive(Deserialize, Serialize, Clone)]
pub struct RecipeForUpload {
    pub title: String,
    pub description: String,
    /// Derived from the title when left empty
    #[serde(default)]
    pub slug: String,
    pub preparation_time: u32,
    pub preparation_time_unit: String,
    pub servings: u32,
    pub servings_unit: String,
    pub preparation_steps: String,
    #[serde(default)]
    pub preparation_steps_is_html: bool,
    #[serde(default)]
    pub is_published: bool,
    /// Relative path of an already-stored cover image
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub author_id: Option<i64>,
}

impl std::fmt::Debug for RecipeForUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipeForUpload")
            .field("title", &self.title)
            .field("slug", &self.slug)
            .field("preparation_steps", &self.preparation_steps.len())
            .field("is_published", &self.is_published)
            .field("cover", &self.cover)
            .field("category_id", &self.category_id)
            .field("author_id", &self.author_id)
            .finish()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CategoryForUpload {
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UserForUpload {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_default_to_unpublished_and_unreferenced() {
        let upload: RecipeForUpload = serde_json::from_str(
            r#"{
                "title": "Bolo de cenoura",
                "description": "Fofinho",
                "preparation_time": 40,
                "preparation_time_unit": "Minutos",
                "servings": 8,
                "servings_unit": "Fatias",
                "preparation_steps": "Bata tudo."
            }"#,
        )
        .unwrap();
        assert!(!upload.is_published);
        assert!(!upload.preparation_steps_is_html);
        assert_eq!(upload.slug, "");
        assert_eq!(upload.category_id, None);
        assert_eq!(upload.author_id, None);
        assert_eq!(upload.cover, None);
    }

    #[test]
    fn debug_output_elides_the_steps() {
        let upload = RecipeForUpload {
            title: "Torta".into(),
            description: String::new(),
            slug: "torta".into(),
            preparation_time: 1,
            preparation_time_unit: "Hora".into(),
            servings: 4,
            servings_unit: "Pessoas".into(),
            preparation_steps: "a very long secret text".into(),
            preparation_steps_is_html: false,
            is_published: true,
            cover: None,
            category_id: Some(5),
            author_id: None,
        };
        let debug = format!("{:?}", upload);
        assert!(debug.contains("Torta"));
        assert!(!debug.contains("secret"));
    }
}
