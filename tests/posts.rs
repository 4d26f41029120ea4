mod support;

use axum::http::{StatusCode, header::CONTENT_TYPE};
use support::{Part, SMALL_GIF, TestApp, body_string, get, location, post_form, post_multipart};

const FORM_TEXT: &str = "Пост для проверки работы формы";

#[tokio::test]
async fn authenticated_create_redirects_to_profile() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let token = app.blog.login(&author);
    let before = app.blog.post_count();

    let response = app
        .send(post_multipart(
            "/create/",
            Some(&token),
            &[Part::Text("text", FORM_TEXT)],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/profile/author/");
    assert_eq!(app.blog.post_count(), before + 1);

    let post = app.blog.latest_post().expect("post stored");
    assert_eq!(post.text, FORM_TEXT);
    assert_eq!(post.author_id, author.id);
    assert_eq!(post.group_id, None);
}

#[tokio::test]
async fn anonymous_create_redirects_to_login_without_writing() {
    let app = TestApp::new();

    let response = app
        .send(post_multipart(
            "/create/",
            None,
            &[Part::Text("text", FORM_TEXT)],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/auth/login/?next=/create/");
    assert_eq!(app.blog.post_count(), 0);

    let form = app.send(get("/create/", None)).await;
    assert_eq!(form.status(), StatusCode::FOUND);
    assert_eq!(location(&form), "/auth/login/?next=/create/");
}

#[tokio::test]
async fn urlencoded_create_is_a_bad_request() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let token = app.blog.login(&author);

    let response = app
        .send(post_form("/create/", Some(&token), "text=plain+form"))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.blog.post_count(), 0);
}

#[tokio::test]
async fn create_form_lists_groups() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let token = app.blog.login(&author);
    let group = app.blog.add_group("Travel notes", "travel");

    let response = app.send(get("/create/", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains(&format!("<option value=\"{}\">Travel notes</option>", group.id)));
    assert!(body.contains("enctype=\"multipart/form-data\""));
}

#[tokio::test]
async fn blank_text_rerenders_form_with_field_error() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let token = app.blog.login(&author);

    let response = app
        .send(post_multipart(
            "/create/",
            Some(&token),
            &[Part::Text("text", "   ")],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("This field is required."));
    assert_eq!(app.blog.post_count(), 0);
}

#[tokio::test]
async fn unknown_group_is_a_field_error() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let token = app.blog.login(&author);

    let response = app
        .send(post_multipart(
            "/create/",
            Some(&token),
            &[Part::Text("text", "Hello"), Part::Text("group", "4242")],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Select a valid choice."));
    // Submitted text survives the round trip.
    assert!(body.contains(">Hello</textarea>"));
    assert_eq!(app.blog.post_count(), 0);
}

#[tokio::test]
async fn create_with_group_and_image_stores_and_serves_the_file() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let token = app.blog.login(&author);
    let group = app.blog.add_group("Travel notes", "travel");
    let group_id = group.id.to_string();

    let response = app
        .send(post_multipart(
            "/create/",
            Some(&token),
            &[
                Part::Text("text", "Post with a picture"),
                Part::Text("group", &group_id),
                Part::File {
                    name: "image",
                    file_name: "small.gif",
                    content_type: "image/gif",
                    bytes: SMALL_GIF,
                },
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let post = app.blog.latest_post().expect("post stored");
    assert_eq!(post.group_id, Some(group.id));
    let image = post.image.expect("image path recorded");
    assert!(image.starts_with("posts/"));
    assert!(image.ends_with("-small.gif"));
    assert!(app.uploads.path().join(&image).exists());

    let media = app.send(get(&format!("/media/{image}"), None)).await;
    assert_eq!(media.status(), StatusCode::OK);
    assert_eq!(media.headers()[CONTENT_TYPE], "image/gif");

    let detail = body_string(app.send(get(&format!("/posts/{}/", post.id), None)).await).await;
    assert!(detail.contains(&format!("src=\"/media/{image}\"")));
}

#[tokio::test]
async fn non_image_upload_is_rejected_and_nothing_is_stored() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let token = app.blog.login(&author);

    let response = app
        .send(post_multipart(
            "/create/",
            Some(&token),
            &[
                Part::Text("text", "Broken picture"),
                Part::File {
                    name: "image",
                    file_name: "notes.txt",
                    content_type: "text/plain",
                    bytes: b"definitely not an image",
                },
            ],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Upload a valid image."));
    assert_eq!(app.blog.post_count(), 0);
    assert!(!app.uploads.path().join("posts").exists());
}

#[tokio::test]
async fn empty_file_part_counts_as_no_upload() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let token = app.blog.login(&author);

    let response = app
        .send(post_multipart(
            "/create/",
            Some(&token),
            &[
                Part::Text("text", "No picture chosen"),
                Part::File {
                    name: "image",
                    file_name: "",
                    content_type: "application/octet-stream",
                    bytes: b"",
                },
            ],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let post = app.blog.latest_post().expect("post stored");
    assert_eq!(post.image, None);
}

#[tokio::test]
async fn missing_media_is_not_found() {
    let app = TestApp::new();
    for path in ["/media/posts/nothing.gif", "/media/../secret"] {
        let response = app.send(get(path, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn non_author_edit_redirects_to_detail_and_changes_nothing() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let intruder = app.blog.add_user("intruder");
    let token = app.blog.login(&intruder);
    let post = app.blog.add_post(&author, "Original text", None);
    let edit_path = format!("/posts/{}/edit/", post.id);

    let form = app.send(get(&edit_path, Some(&token))).await;
    assert_eq!(form.status(), StatusCode::FOUND);
    assert_eq!(location(&form), format!("/posts/{}/", post.id));

    let submit = app
        .send(post_multipart(
            &edit_path,
            Some(&token),
            &[Part::Text("text", "Hijacked")],
        ))
        .await;
    assert_eq!(submit.status(), StatusCode::FOUND);
    assert_eq!(location(&submit), format!("/posts/{}/", post.id));
    assert_eq!(app.blog.post(post.id).expect("post kept").text, "Original text");
}

#[tokio::test]
async fn anonymous_edit_redirects_to_login_with_next() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let post = app.blog.add_post(&author, "Original text", None);

    let response = app
        .send(get(&format!("/posts/{}/edit/", post.id), None))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        format!("/auth/login/?next=/posts/{}/edit/", post.id)
    );
}

#[tokio::test]
async fn editing_a_missing_post_is_not_found() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let token = app.blog.login(&author);

    let response = app.send(get("/posts/404/edit/", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn author_edit_updates_text_and_keeps_pub_date() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let token = app.blog.login(&author);
    let post = app.blog.add_post(&author, "Draft wording", None);
    let edit_path = format!("/posts/{}/edit/", post.id);

    let form = app.send(get(&edit_path, Some(&token))).await;
    assert_eq!(form.status(), StatusCode::OK);
    let body = body_string(form).await;
    assert!(body.contains(">Draft wording</textarea>"));
    assert!(body.contains("Edit post"));

    let response = app
        .send(post_multipart(
            &edit_path,
            Some(&token),
            &[Part::Text("text", "Final wording")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    let updated = app.blog.post(post.id).expect("post kept");
    assert_eq!(updated.text, "Final wording");
    assert_eq!(updated.pub_date, post.pub_date);
    assert_eq!(updated.author_id, author.id);
}

#[tokio::test]
async fn edit_keeps_existing_image_unless_cleared() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let token = app.blog.login(&author);

    let created = app
        .send(post_multipart(
            "/create/",
            Some(&token),
            &[
                Part::Text("text", "With image"),
                Part::File {
                    name: "image",
                    file_name: "small.gif",
                    content_type: "image/gif",
                    bytes: SMALL_GIF,
                },
            ],
        ))
        .await;
    assert_eq!(created.status(), StatusCode::FOUND);
    let post = app.blog.latest_post().expect("post stored");
    let image = post.image.clone().expect("image stored");
    let edit_path = format!("/posts/{}/edit/", post.id);

    let kept = app
        .send(post_multipart(
            &edit_path,
            Some(&token),
            &[Part::Text("text", "Still with image")],
        ))
        .await;
    assert_eq!(kept.status(), StatusCode::FOUND);
    assert_eq!(
        app.blog.post(post.id).expect("post").image.as_deref(),
        Some(image.as_str())
    );

    let cleared = app
        .send(post_multipart(
            &edit_path,
            Some(&token),
            &[
                Part::Text("text", "Image removed"),
                Part::Text("image-clear", "on"),
            ],
        ))
        .await;
    assert_eq!(cleared.status(), StatusCode::FOUND);
    assert_eq!(app.blog.post(post.id).expect("post").image, None);
    assert!(!app.uploads.path().join(&image).exists());
}

#[tokio::test]
async fn comments_are_stored_for_signed_in_users() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let reader = app.blog.add_user("reader");
    let token = app.blog.login(&reader);
    let post = app.blog.add_post(&author, "Discuss this", None);
    let comment_path = format!("/posts/{}/comment/", post.id);

    let response = app
        .send(post_form(&comment_path, Some(&token), "text=Nice+post"))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    let comments = app.blog.comments_on(post.id);
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "Nice post");
    assert_eq!(comments[0].author_id, reader.id);

    let detail = body_string(app.send(get(&format!("/posts/{}/", post.id), None)).await).await;
    assert!(detail.contains("Nice post"));
}

#[tokio::test]
async fn blank_comment_is_dropped_but_still_redirects() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let token = app.blog.login(&author);
    let post = app.blog.add_post(&author, "Discuss this", None);

    let response = app
        .send(post_form(
            &format!("/posts/{}/comment/", post.id),
            Some(&token),
            "text=+++",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));
    assert!(app.blog.comments_on(post.id).is_empty());
}

#[tokio::test]
async fn anonymous_comment_redirects_to_login() {
    let app = TestApp::new();
    let author = app.blog.add_user("author");
    let post = app.blog.add_post(&author, "Discuss this", None);
    let comment_path = format!("/posts/{}/comment/", post.id);

    let response = app.send(post_form(&comment_path, None, "text=Hi")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        format!("/auth/login/?next={comment_path}")
    );
    assert!(app.blog.comments_on(post.id).is_empty());
}

#[tokio::test]
async fn comment_on_missing_post_is_not_found() {
    let app = TestApp::new();
    let reader = app.blog.add_user("reader");
    let token = app.blog.login(&reader);

    let response = app
        .send(post_form("/posts/77/comment/", Some(&token), "text=Hi"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
