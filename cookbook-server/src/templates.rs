/// Link to a file kept in media storage. The path is percent-encoded here, so the result
/// is marked safe and keeps its slashes.
fn media_url(rel_path: String) -> minijinja::Value {
    minijinja::Value::from_safe_string(format!(
        "/media/{}",
        url_escape::encode_path(&rel_path)
    ))
}

lazy_static::lazy_static! {
    pub static ref TEMPLATES: minijinja::Environment<'static> = {
        let mut env = minijinja::Environment::new();
        for (name, template) in &[
            ("base.html.jinja", include_str!("../templates/base.html.jinja")),
            ("partials/recipe.html.jinja", include_str!("../templates/partials/recipe.html.jinja")),
            ("pages/home.html.jinja", include_str!("../templates/pages/home.html.jinja")),
            ("pages/category.html.jinja", include_str!("../templates/pages/category.html.jinja")),
            ("pages/recipe-view.html.jinja", include_str!("../templates/pages/recipe-view.html.jinja")),
        ] {
            env.add_template(name, template)
                .expect("Failed to register template");
        }
        env.add_filter("media_url", media_url);
        env
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RecipeView;
    use crate::models::{Category, Recipe, User};
    use minijinja::context;

    fn view(steps: &str, is_html: bool) -> RecipeView {
        RecipeView {
            recipe: Recipe {
                recipe_id: 7,
                title: "Bolo & Café".into(),
                description: "Para a tarde".into(),
                slug: "bolo-cafe".into(),
                preparation_time: 40,
                preparation_time_unit: "Minutos".into(),
                servings: 8,
                servings_unit: "Fatias".into(),
                preparation_steps: steps.into(),
                preparation_steps_is_html: is_html,
                created_at: "2024-03-09 10:00:00".into(),
                updated_at: "2024-03-09 10:00:00".into(),
                is_published: true,
                cover: Some("recipes/covers/2024/03/09/bolo.png".into()),
                category_id: Some(5),
                author_id: Some(3),
            },
            category: Some(Category {
                category_id: 5,
                name: "Doces".into(),
            }),
            author: Some(User {
                user_id: 3,
                username: "elias".into(),
                first_name: "Elias".into(),
                last_name: "Silva".into(),
            }),
        }
    }

    fn render_detail(view: RecipeView) -> String {
        TEMPLATES
            .get_template("pages/recipe-view.html.jinja")
            .unwrap()
            .render(context! { recipe => view, is_detail_page => true })
            .unwrap()
    }

    #[test]
    fn plain_steps_are_escaped() {
        let page = render_detail(view("<script>alert(1)</script>", false));
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn html_steps_are_rendered_as_markup() {
        let page = render_detail(view("<ol><li>Bata</li></ol>", true));
        assert!(page.contains("<ol><li>Bata</li></ol>"));
    }

    #[test]
    fn detail_page_shows_references_and_cover() {
        let page = render_detail(view("Bata.", false));
        assert!(page.contains("Bolo &amp; Café | Recipes"));
        assert!(page.contains("/media/recipes/covers/2024/03/09/bolo.png"));
        assert!(page.contains("/recipes/category/5/"));
        assert!(page.contains("Elias Silva"));
        assert!(!page.contains("see more..."));
    }

    #[test]
    fn listings_link_to_detail_pages_without_steps() {
        let page = TEMPLATES
            .get_template("pages/home.html.jinja")
            .unwrap()
            .render(context! { recipes => vec![view("secret steps", false)] })
            .unwrap();
        assert!(page.contains("href=\"/recipes/7/\""));
        assert!(page.contains("see more..."));
        assert!(!page.contains("secret steps"));
    }

    #[test]
    fn media_urls_are_percent_encoded() {
        let url = media_url("recipes/covers/2024/03/09/a \"b\".png".into());
        assert_eq!(
            url.to_string(),
            "/media/recipes/covers/2024/03/09/a%20%22b%22.png"
        );
    }

    #[test]
    fn empty_home_page_says_so() {
        let page = TEMPLATES
            .get_template("pages/home.html.jinja")
            .unwrap()
            .render(context! { recipes => Vec::<RecipeView>::new() })
            .unwrap();
        assert!(page.contains("No recipes have been published yet."));
    }
}
