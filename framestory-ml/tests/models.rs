use framestory_ml::story::{StoryModel, TextGenerator};
use framestory_ml::vision::{VisionLanguageModel, VisionModel};
use framestory_ml::{GenerateOptions, ModelSpec};
use image::{DynamicImage, Rgb, RgbImage};

#[tokio::test]
#[ignore = "downloads model weights"]
async fn moondream_describes_a_frame() -> anyhow::Result<()> {
    let spec = ModelSpec::new("vikhyatk/moondream2", "2024-03-06");
    let mut model = VisionModel::load(&spec, true).await?;

    let mut canvas = RgbImage::from_pixel(256, 256, Rgb([240, 240, 240]));
    for x in 96..160 {
        for y in 96..160 {
            canvas.put_pixel(x, y, Rgb([200, 20, 20]));
        }
    }
    let image = DynamicImage::ImageRgb8(canvas);

    let inputs = model.prepare_inputs(&image, "What is in the center of the image?")?;
    assert_eq!(inputs.input_ids.dtype(), candle_core::DType::U32);
    assert_eq!(inputs.pixel_values.dtype(), model.dtype());

    let tokens = model.generate(&inputs, 32)?;
    assert!(tokens.len() <= 32);
    let text = model.decode(&tokens)?;
    assert!(!text.trim().is_empty(), "model should describe the image");

    Ok(())
}

#[tokio::test]
#[ignore = "downloads model weights"]
async fn flan_t5_continues_a_prompt() -> anyhow::Result<()> {
    let spec = ModelSpec::new("google/flan-t5-small", "main");
    let options = GenerateOptions {
        max_new_tokens: 32,
        ..GenerateOptions::default()
    };
    let mut model = StoryModel::load(&spec, options, true).await?;

    let story = model.generate("Write one sentence about a fox watching a bird.")?;
    assert!(!story.trim().is_empty());

    Ok(())
}
